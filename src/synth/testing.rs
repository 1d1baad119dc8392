//! Test doubles for the voice contract.

use std::sync::{Arc, Mutex};

use crate::synth::voice::{ProcessCtx, Voice, VoiceState};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Trigger {
        level: f32,
        retrigger: bool,
        key: Option<u8>,
        pitch: f32,
        stack_index: usize,
    },
    Release,
    Kill {
        soft: bool,
    },
    SampleRate(f32),
}

/// Shared view of the calls a [`RecordingVoice`] received.
#[derive(Debug, Clone, Default)]
pub(crate) struct VoiceLog(Arc<Mutex<Vec<Call>>>);

impl VoiceLog {
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn triggers(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Trigger { .. }))
            .collect()
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers().len()
    }

    pub fn release_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Release))
            .count()
    }

    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }
}

/// Voice that records every lifecycle call.
///
/// Triggering makes it busy; releasing keeps it busy until the next
/// processed sub-block (a one-sub-block tail); killing frees it at once.
/// Processing adds 1.0 to every output sample in range.
pub(crate) struct RecordingVoice {
    busy: bool,
    released: bool,
    log: VoiceLog,
}

impl RecordingVoice {
    pub fn new() -> Self {
        Self::with_log().0
    }

    pub fn with_log() -> (Self, VoiceLog) {
        let log = VoiceLog::default();
        let voice = Self {
            busy: false,
            released: false,
            log: log.clone(),
        };
        (voice, log)
    }
}

impl Voice for RecordingVoice {
    fn is_busy(&self) -> bool {
        self.busy
    }

    fn is_released(&self) -> bool {
        !self.busy || self.released
    }

    fn trigger(&mut self, state: &VoiceState, level: f32, is_retrigger: bool) {
        self.busy = true;
        self.released = false;
        self.log.push(Call::Trigger {
            level,
            retrigger: is_retrigger,
            key: state.key,
            pitch: state.base_pitch,
            stack_index: state.stack_index,
        });
    }

    fn release(&mut self) {
        self.released = true;
        self.log.push(Call::Release);
    }

    fn kill(&mut self, soft: bool) {
        self.busy = false;
        self.released = false;
        self.log.push(Call::Kill { soft });
    }

    fn process_samples(
        &mut self,
        _state: &VoiceState,
        ctx: &ProcessCtx,
        _inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
    ) {
        for channel in outputs.iter_mut() {
            for sample in &mut channel[ctx.range()] {
                *sample += 1.0;
            }
        }
        if self.released {
            self.busy = false;
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.log.push(Call::SampleRate(sample_rate));
    }
}
