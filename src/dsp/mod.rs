//! Low-level DSP primitives used by the reference voices.
//!
//! These components are allocation-free and realtime-safe, so they can be
//! embedded directly inside voice structs.

/// Attack/decay/sustain/release envelope generator.
pub mod envelope;

pub use envelope::{Envelope, EnvelopeState};
