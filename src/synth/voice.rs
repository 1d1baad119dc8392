/// Allocation bookkeeping the synth keeps for every pooled voice.
///
/// The synth writes this; the voice only reads it (base pitch and aftertouch
/// are picked up at trigger and process time).
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceState {
    /// Sample time of the last poly-mode trigger, `None` if never triggered.
    pub start_time: Option<u64>,
    /// Key currently driving the voice.
    pub key: Option<u8>,
    /// Key the voice was last removed from (glide source).
    pub previous_key: Option<u8>,
    /// MIDI pitch after tuning and transposition.
    pub base_pitch: f32,
    /// 0.0..=1.0
    pub aftertouch: f32,
    /// Position in the unison stack, 0-based.
    pub stack_index: usize,
}

impl VoiceState {
    pub fn new() -> Self {
        Self {
            start_time: None,
            key: None,
            previous_key: None,
            base_pitch: 0.0,
            aftertouch: 0.0,
            stack_index: 0,
        }
    }

    /// Detach from the current key, remembering it as the previous key.
    pub fn removed_from_key(&mut self) {
        self.previous_key = self.key;
        self.key = None;
        self.aftertouch = 0.0;
    }
}

impl Default for VoiceState {
    fn default() -> Self {
        Self::new()
    }
}

/// Position of one sub-block inside the host's buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessCtx {
    /// First frame of the sub-block.
    pub start: usize,
    /// Frames to render.
    pub frames: usize,
    /// Pitch wheel, -1.0..=1.0
    pub pitch_bend: f32,
    /// Global mod wheel, 0.0..=1.0
    pub mod_wheel: f32,
}

impl ProcessCtx {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.frames
    }
}

/// Lifecycle contract between the synth and a sound-generating voice.
///
/// The synth decides which voice plays what; the voice decides how it
/// sounds. Implementations must be realtime-safe.
pub trait Voice: Send {
    /// Still producing sound (including the release tail).
    fn is_busy(&self) -> bool;

    /// Free, or amplitude envelope in its release stage.
    fn is_released(&self) -> bool;

    /// Start (or restart) the voice.
    ///
    /// `level` is the normalised velocity. `is_retrigger` is true when the
    /// voice was still sounding and is being re-attacked.
    fn trigger(&mut self, _state: &VoiceState, _level: f32, _is_retrigger: bool) {
        // Default: do nothing
    }

    /// Key released: move the envelopes into their release stage.
    fn release(&mut self) {
        // Default: do nothing
    }

    /// Silence the voice. A hard kill is immediate, a soft kill fades out
    /// as quickly as possible without clicking.
    fn kill(&mut self, _soft: bool) {
        // Default: do nothing
    }

    /// Render `ctx.frames` frames starting at `ctx.start`.
    ///
    /// Output must be added to `outputs`, never written over, so that all
    /// voices sum.
    fn process_samples(
        &mut self,
        state: &VoiceState,
        ctx: &ProcessCtx,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
    );

    fn set_sample_rate(&mut self, _sample_rate: f32) {
        // Default: do nothing
    }
}

/// Allow boxed voices to be used as voices (for dynamic dispatch)
impl Voice for Box<dyn Voice> {
    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn is_released(&self) -> bool {
        (**self).is_released()
    }

    fn trigger(&mut self, state: &VoiceState, level: f32, is_retrigger: bool) {
        (**self).trigger(state, level, is_retrigger)
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn kill(&mut self, soft: bool) {
        (**self).kill(soft)
    }

    fn process_samples(
        &mut self,
        state: &VoiceState,
        ctx: &ProcessCtx,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
    ) {
        (**self).process_samples(state, ctx, inputs, outputs)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        (**self).set_sample_rate(sample_rate)
    }
}

/// One pool entry: the voice plus the synth's bookkeeping for it.
pub struct VoiceSlot {
    voice: Box<dyn Voice>,
    pub state: VoiceState,
}

impl VoiceSlot {
    pub fn new(voice: Box<dyn Voice>) -> Self {
        Self {
            voice,
            state: VoiceState::new(),
        }
    }

    pub fn voice(&self) -> &dyn Voice {
        self.voice.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.voice.is_busy()
    }

    pub fn is_released(&self) -> bool {
        self.voice.is_released()
    }

    pub fn trigger(&mut self, level: f32, is_retrigger: bool) {
        self.voice.trigger(&self.state, level, is_retrigger);
    }

    /// Release the voice and detach it from its key.
    pub fn stop(&mut self) {
        self.voice.release();
        self.state.removed_from_key();
    }

    /// Kill the voice and detach it from its key.
    pub fn kill(&mut self, soft: bool) {
        self.voice.kill(soft);
        self.state.removed_from_key();
    }

    pub fn process(&mut self, ctx: &ProcessCtx, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        self.voice.process_samples(&self.state, ctx, inputs, outputs);
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.voice.set_sample_rate(sample_rate);
    }
}
