//! Ready-made voices.
//!
//! The synth only needs the [`crate::synth::Voice`] contract; these are
//! reference implementations for demos, benchmarks and tests.
//!
//! # Example
//!
//! ```ignore
//! use saavy_voices::{voices::SineVoice, EngineConfig, PolySynth};
//!
//! let config = EngineConfig::default().with_active_voices(8);
//! let synth = PolySynth::with_factory(config, || SineVoice::new(48_000.0))?;
//! ```

mod sine;

pub use sine::SineVoice;
