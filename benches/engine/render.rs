//! Benchmarks for steady-state rendering.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_voices::{synth::SynthEvent, PolyMode};

use super::sine_synth;
use crate::BLOCK_SIZES;

pub fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/render");

    for &size in BLOCK_SIZES {
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        // Idle synth: the early-out path
        let mut synth = sine_synth(PolyMode::Poly, 32, size);
        group.bench_with_input(BenchmarkId::new("idle", size), &size, |b, &size| {
            b.iter(|| {
                synth.process_block(&[], &mut [&mut left, &mut right], black_box(size));
            })
        });

        // Four-note chord held
        let mut synth = sine_synth(PolyMode::Poly, 32, size);
        for key in [48, 55, 60, 64] {
            synth.enqueue(SynthEvent::note_on(key, 100).at(0));
        }
        group.bench_with_input(BenchmarkId::new("chord_4", size), &size, |b, &size| {
            b.iter(|| {
                synth.process_block(&[], &mut [&mut left, &mut right], black_box(size));
            })
        });

        // Full pool: 32 voices sounding
        let mut synth = sine_synth(PolyMode::Poly, 32, size);
        for key in 40..72 {
            synth.enqueue(SynthEvent::note_on(key, 100).at(0));
        }
        group.bench_with_input(BenchmarkId::new("full_32", size), &size, |b, &size| {
            b.iter(|| {
                synth.process_block(&[], &mut [&mut left, &mut right], black_box(size));
            })
        });
    }

    group.finish();
}
