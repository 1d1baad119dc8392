//! Sine voice.
//!
//! The smallest useful voice: one sine oscillator through a linear ADSR.
//! Good for checking allocation by ear and for benchmarking the engine
//! without the cost of a real patch.
//!
//! # How It Works
//!
//! 1. Pitch = base pitch from the synth + pitch bend + unison spread
//! 2. Sine oscillator at that pitch
//! 3. Amplitude = envelope x velocity x (1 + aftertouch / 2)
//!
//! Unison copies fan out around the base pitch: stack index 1 goes up by
//! `detune`, 2 goes down, 3 goes up twice as far, and so on.

use std::f32::consts::TAU;

use crate::{
    dsp::envelope::Envelope,
    io::converter::midi_note_to_freq,
    synth::voice::{ProcessCtx, Voice, VoiceState},
};

pub struct SineVoice {
    env: Envelope,
    sample_rate: f32,
    phase: f32,
    level: f32,
    gain: f32,
    /// Semitones at full pitch-wheel deflection.
    bend_range: f32,
    /// Semitones between neighbouring unison copies.
    detune: f32,
}

impl SineVoice {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            env: Envelope::adsr(sample_rate, 0.005, 0.1, 0.7, 0.25),
            sample_rate,
            phase: 0.0,
            level: 0.0,
            gain: 0.2,
            bend_range: 2.0,
            detune: 0.1,
        }
    }

    pub fn with_envelope(mut self, attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        self.env = Envelope::adsr(self.sample_rate, attack, decay, sustain, release);
        self
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_bend_range(mut self, semitones: f32) -> Self {
        self.bend_range = semitones;
        self
    }

    pub fn with_detune(mut self, semitones: f32) -> Self {
        self.detune = semitones;
        self
    }

    fn unison_spread(&self, stack_index: usize) -> f32 {
        let steps = stack_index.div_ceil(2) as f32;
        let sign = if stack_index % 2 == 1 { 1.0 } else { -1.0 };
        sign * steps * self.detune
    }
}

impl Voice for SineVoice {
    fn is_busy(&self) -> bool {
        self.env.is_active()
    }

    fn is_released(&self) -> bool {
        self.env.is_released()
    }

    fn trigger(&mut self, _state: &VoiceState, level: f32, is_retrigger: bool) {
        self.level = level;
        if !is_retrigger {
            self.phase = 0.0;
        }
        self.env.note_on();
    }

    fn release(&mut self) {
        self.env.note_off();
    }

    fn kill(&mut self, soft: bool) {
        self.env.kill(soft);
    }

    fn process_samples(
        &mut self,
        state: &VoiceState,
        ctx: &ProcessCtx,
        _inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
    ) {
        let pitch = state.base_pitch
            + ctx.pitch_bend * self.bend_range
            + self.unison_spread(state.stack_index);
        let increment = midi_note_to_freq(pitch) / self.sample_rate;
        let amp = self.level * self.gain * (1.0 + 0.5 * state.aftertouch);

        for i in ctx.range() {
            let sample = (TAU * self.phase).sin() * self.env.next_sample() * amp;
            self.phase = (self.phase + increment).fract();

            for channel in outputs.iter_mut() {
                channel[i] += sample;
            }
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.env.set_sample_rate(sample_rate);
    }
}
