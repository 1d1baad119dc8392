// Purpose: Voice management, polyphony, MIDI handling
// This layer sits above the voices and decides which one plays what

pub mod allocator;
pub mod factory;
pub mod keys;
pub mod message;
pub mod modulation;
pub mod poly;
pub mod pool;
pub mod tuning;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;

pub use message::{ControlChange, SynthEvent, TimedEvent};
pub use voice::{ProcessCtx, Voice, VoiceState};
