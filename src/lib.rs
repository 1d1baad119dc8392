pub mod dsp;
pub mod engine; // Event queue and engine configuration
pub mod io;
pub mod synth; // Voice management and polyphony
pub mod voices;

pub use engine::config::{AftertouchMode, EngineConfig, PolyMode};
pub use synth::poly::PolySynth;

/// Hard upper bound on the number of voices a synth can manage.
pub const MAX_VOICES: usize = 32;
pub const MAX_BLOCK_SIZE: usize = 2048;
/// Size of the MIDI key space (and of the curve lookup tables).
pub const KEY_COUNT: usize = 128;
pub const DEFAULT_GRANULARITY: usize = 16;
pub const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
