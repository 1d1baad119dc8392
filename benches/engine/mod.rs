//! Engine benchmarks.

mod allocation;
mod render;

pub use allocation::bench_allocation;
pub use render::bench_render;

use saavy_voices::{voices::SineVoice, EngineConfig, PolyMode, PolySynth};

use crate::SAMPLE_RATE;

/// Synth with `voices` sine voices, sized for `block_size`.
pub fn sine_synth(mode: PolyMode, voices: usize, block_size: usize) -> PolySynth {
    let config = EngineConfig::default()
        .with_poly_mode(mode)
        .with_active_voices(voices)
        .with_sample_rate(SAMPLE_RATE)
        .with_block_size(block_size);

    PolySynth::with_factory(config, || SineVoice::new(SAMPLE_RATE)).expect("valid bench config")
}
