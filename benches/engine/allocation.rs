//! Benchmarks for note allocation.
//!
//! Each iteration queues a burst of notes and renders one block, so the
//! numbers include dispatch, stealing and the voice render itself.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_voices::{synth::SynthEvent, PolyMode};

use super::sine_synth;
use crate::BLOCK_SIZES;

pub fn bench_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/allocation");

    for &size in BLOCK_SIZES {
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        // === FREE VOICES ===
        // 8 notes into 32 voices, released in the same block
        let mut synth = sine_synth(PolyMode::Poly, 32, size);
        group.bench_with_input(BenchmarkId::new("poly_free", size), &size, |b, &size| {
            b.iter(|| {
                for key in 60..68 {
                    synth.enqueue(SynthEvent::note_on(key, 100).at(0));
                    synth.enqueue(SynthEvent::note_off(key).at(size / 2));
                }
                synth.process_block(&[], &mut [&mut left, &mut right], black_box(size));
            })
        });

        // === STEALING ===
        // 32 new notes per block into 8 voices, every note-on steals
        let mut synth = sine_synth(PolyMode::Poly, 8, size);
        let mut base = 0u8;
        group.bench_with_input(BenchmarkId::new("poly_steal", size), &size, |b, &size| {
            b.iter(|| {
                for i in 0..32 {
                    let key = 24 + (base + i) % 96;
                    synth.enqueue(SynthEvent::note_on(key, 100).at(i as usize * size / 32));
                }
                base = base.wrapping_add(32) % 96;
                synth.process_block(&[], &mut [&mut left, &mut right], black_box(size));
            })
        });

        // === LEGATO ===
        // overlapping line in mono legato, exercises the held-key stack
        let mut synth = sine_synth(PolyMode::MonoLegato, 8, size);
        group.bench_with_input(BenchmarkId::new("mono_legato", size), &size, |b, &size| {
            b.iter(|| {
                for key in 60..72 {
                    synth.enqueue(SynthEvent::note_on(key, 100).at(0));
                }
                for key in (60..72).rev() {
                    synth.enqueue(SynthEvent::note_off(key).at(size / 2));
                }
                synth.process_block(&[], &mut [&mut left, &mut right], black_box(size));
            })
        });
    }

    group.finish();
}
