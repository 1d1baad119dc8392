use crate::{
    engine::{
        config::{AftertouchMode, EngineConfig, PolyMode},
        error::ConfigError,
        queue::EventQueue,
    },
    synth::{
        allocator::{NoteAllocator, NoteCtx},
        factory::VoiceFactory,
        keys::KeyPress,
        message::{ControlChange, MessageReceiver, SynthEvent, TimedEvent},
        modulation::{Curve, ModState},
        pool::VoicePool,
        tuning::PitchMap,
        voice::{ProcessCtx, Voice, VoiceSlot},
    },
    MAX_VOICES,
};

/// Polyphonic/monophonic synth engine driving a pool of voices.
///
/// Events are queued with a frame offset, then applied sample-accurately
/// (to the granularity grid) while [`PolySynth::process_block`] walks the
/// block in sub-blocks. Everything on the processing path is allocation-free
/// and lock-free; configuration changes belong between blocks.
pub struct PolySynth {
    config: EngineConfig,
    voices: VoicePool,
    queue: EventQueue,
    allocator: NoteAllocator,
    mods: ModState,
    sample_time: u64,
    voices_active: bool,
}

impl PolySynth {
    /// Create an engine with an empty voice pool.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut voices = VoicePool::new();
        voices.set_limit(config.active_voices);

        let mut queue = EventQueue::new(config.granularity);
        queue.reserve(config.block_size);

        log::debug!(
            "synth created: {:?} mode, {} voices, granularity {}",
            config.poly_mode,
            config.active_voices,
            config.granularity
        );

        Ok(Self {
            config,
            voices,
            queue,
            allocator: NoteAllocator::new(),
            mods: ModState::new(),
            sample_time: 0,
            voices_active: false,
        })
    }

    /// Create an engine and fill the pool with `config.active_voices`
    /// voices from `factory`.
    pub fn with_factory<F>(config: EngineConfig, factory: F) -> Result<Self, ConfigError>
    where
        F: VoiceFactory,
    {
        let mut synth = Self::new(config)?;
        for _ in 0..config.active_voices {
            synth.add_voice(factory.create_voice())?;
        }
        Ok(synth)
    }

    /// Hand a voice to the pool. Returns its index.
    pub fn add_voice<V: Voice + 'static>(&mut self, voice: V) -> Result<usize, ConfigError> {
        let mut voice: Box<dyn Voice> = Box::new(voice);
        voice.set_sample_rate(self.config.sample_rate);
        let index = self.voices.add(voice)?;
        log::trace!("voice {index} added");
        Ok(index)
    }

    /// Drop every voice in the pool.
    pub fn clear_voices(&mut self) {
        self.voices.clear();
        self.voices_active = false;
    }

    /// Panics if `index` is out of range.
    pub fn voice(&self, index: usize) -> &VoiceSlot {
        self.voices.get(index)
    }

    pub fn voice_index(&self, voice: &dyn Voice) -> Option<usize> {
        self.voices.index_of(voice)
    }

    /// First voice currently bound to `key`.
    pub fn voice_for_key(&self, key: u8) -> Option<usize> {
        self.voices.voice_for_key(key)
    }

    // --- configuration (between blocks only) ---

    /// Not click-safe: voices already sounding keep their assignment.
    pub fn set_poly_mode(&mut self, mode: PolyMode) {
        log::debug!("poly mode {:?} -> {:?}", self.config.poly_mode, mode);
        self.config.poly_mode = mode;
    }

    /// Not click-safe, like [`PolySynth::set_poly_mode`].
    pub fn set_aftertouch_mode(&mut self, mode: AftertouchMode) {
        self.config.aftertouch_mode = mode;
    }

    /// Clamped to `1..=active_voices`.
    pub fn set_unison_voices(&mut self, voices: usize) {
        let clamped = voices.clamp(1, self.config.active_voices);
        if clamped != voices {
            log::warn!("unison voices {voices} clamped to {clamped}");
        }
        self.config.unison_voices = clamped;
    }

    /// Hard-kills every voice, then changes how many may be used.
    pub fn set_active_voices(&mut self, voices: usize) {
        debug_assert!(
            voices > 0 && voices <= MAX_VOICES,
            "active voice count must be in 1..={MAX_VOICES}"
        );
        let voices = voices.clamp(1, MAX_VOICES);
        log::debug!("active voices {} -> {voices}", self.config.active_voices);

        self.voices.set_limit(voices);
        self.config.active_voices = voices;
        self.config.unison_voices = self.config.unison_voices.min(voices);
    }

    /// Transposition in semitones, applied at the next trigger.
    pub fn set_note_offset(&mut self, semitones: f32) {
        self.config.note_offset = semitones;
    }

    /// Event grid and largest sub-block, in frames.
    pub fn set_granularity(&mut self, frames: usize) {
        debug_assert!(frames > 0, "granularity must be at least one frame");
        let frames = frames.max(1);
        self.config.granularity = frames;
        self.queue.set_granularity(frames);
    }

    /// Full reset, then propagate the new rate to every voice.
    pub fn set_sample_rate_and_block_size(&mut self, sample_rate: f32, block_size: usize) {
        debug_assert!(sample_rate > 0.0, "sample rate must be positive");
        self.reset();
        self.queue.clear();
        self.queue.reserve(block_size);
        self.config.sample_rate = sample_rate;
        self.config.block_size = block_size;
        self.voices.set_sample_rate(sample_rate);
        log::debug!("sample rate {sample_rate} Hz, block size {block_size}");
    }

    /// Force block processing on (or off) regardless of voice activity.
    pub fn set_voices_active(&mut self, active: bool) {
        self.voices_active = active;
    }

    /// Replace the key-to-pitch mapping (microtonal tunings).
    pub fn set_pitch_map(&mut self, tuning: Box<dyn PitchMap>) {
        self.allocator.set_pitch_map(tuning);
    }

    pub fn velocity_curve_mut(&mut self) -> &mut Curve {
        &mut self.mods.velocity_curve
    }

    pub fn aftertouch_curve_mut(&mut self) -> &mut Curve {
        &mut self.mods.aftertouch_curve
    }

    /// Back to sample time zero with no keys down and every voice
    /// hard-killed. Queued events are kept.
    pub fn reset(&mut self) {
        log::debug!("synth reset");
        self.sample_time = 0;
        self.allocator.all_notes_off(&mut self.voices, false);
    }

    /// Soft-kill every voice and forget all keys and the pedal.
    pub fn all_notes_off(&mut self) {
        self.mods.sustain_down = false;
        self.allocator.all_notes_off(&mut self.voices, true);
    }

    /// Release every sounding voice, keeping key state.
    pub fn release_all_voices(&mut self) {
        self.voices.release_all();
    }

    // --- events ---

    /// Queue an event for the next block. `event.offset` is relative to
    /// that block's first frame.
    pub fn enqueue(&mut self, event: TimedEvent) {
        self.queue.enqueue(event);
    }

    /// Move everything waiting in `rx` into the event queue. Returns the
    /// number of events taken.
    pub fn enqueue_from<R: MessageReceiver + ?Sized>(&mut self, rx: &mut R) -> usize {
        let mut count = 0;
        while let Some(event) = rx.pop() {
            self.queue.enqueue(event);
            count += 1;
        }
        count
    }

    fn dispatch(&mut self, event: SynthEvent) {
        // keys past 127 would grow the key lists on the audio thread
        debug_assert!(event.in_midi_range(), "event outside MIDI range: {event:?}");

        let ctx = NoteCtx {
            config: &self.config,
            mods: &self.mods,
            now: self.sample_time,
        };

        match event {
            SynthEvent::NoteOn { note, velocity } => {
                if self.allocator.note_on(&mut self.voices, &ctx, note, velocity) {
                    self.voices_active = true;
                }
            }
            SynthEvent::NoteOff { note, .. } => {
                if self.allocator.note_off(&mut self.voices, &ctx, note) {
                    self.voices_active = true;
                }
            }
            SynthEvent::PolyAftertouch { note, value } => {
                self.allocator
                    .poly_aftertouch(&mut self.voices, &ctx, note, value);
            }
            SynthEvent::ChannelAftertouch { value } => {
                self.allocator.channel_aftertouch(&mut self.voices, &ctx, value);
            }
            SynthEvent::PitchBend { value } => {
                self.mods.pitch_bend = value.clamp(-1.0, 1.0);
            }
            SynthEvent::ControlChange(cc) => self.control_change(cc),
        }
    }

    fn control_change(&mut self, cc: ControlChange) {
        match cc {
            ControlChange::ModWheel(value) => {
                self.mods.mod_wheel = value.clamp(0.0, 1.0);
            }
            ControlChange::Sustain(value) => {
                self.mods.sustain_down = value >= 0.5;
                if !self.mods.sustain_down {
                    self.allocator.sustain_released(&mut self.voices);
                }
            }
            ControlChange::AllNotesOff => self.all_notes_off(),
            ControlChange::Other { .. } => {}
        }
    }

    // --- processing ---

    /// Render one block. Returns true if the block was silent (nothing to
    /// process).
    pub fn process_block(
        &mut self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        frames: usize,
    ) -> bool {
        self.process_block_with(inputs, outputs, frames, |_, _, _, _| {})
    }

    /// Like [`PolySynth::process_block`], calling `slice` once per sub-block
    /// (after its events, before the voices) with `(inputs, outputs, start,
    /// frames)` for shared block-rate work such as global LFOs.
    pub fn process_block_with<F>(
        &mut self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        frames: usize,
        mut slice: F,
    ) -> bool
    where
        F: FnMut(&[&[f32]], &mut [&mut [f32]], usize, usize),
    {
        debug_assert!(!self.voices.is_empty(), "no voices have been added to the synth");

        for channel in outputs.iter_mut() {
            channel[..frames].fill(0.0);
        }

        if !self.voices_active && self.queue.is_empty() {
            return true;
        }

        let granularity = self.config.granularity;
        let mut start = 0;

        while start < frames {
            let len = (frames - start).min(granularity);

            while let Some(TimedEvent { event, .. }) = self.queue.pop_before(start + len) {
                self.dispatch(event);
            }

            // TODO: smooth parameter changes here once click-safe
            // mode/aftertouch switching exists
            slice(inputs, outputs, start, len);

            let ctx = ProcessCtx {
                start,
                frames: len,
                pitch_bend: self.mods.pitch_bend,
                mod_wheel: self.mods.mod_wheel,
            };
            self.voices.process(&ctx, inputs, outputs);

            start += len;
            self.sample_time += len as u64;
        }

        self.voices_active = self.voices.refresh_status();
        self.queue.shift_and_compact(frames);

        false
    }

    // --- queries ---

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn poly_mode(&self) -> PolyMode {
        self.config.poly_mode
    }

    pub fn aftertouch_mode(&self) -> AftertouchMode {
        self.config.aftertouch_mode
    }

    pub fn unison_voices(&self) -> usize {
        self.config.unison_voices
    }

    pub fn active_voices(&self) -> usize {
        self.config.active_voices
    }

    pub fn max_voices(&self) -> usize {
        MAX_VOICES
    }

    pub fn granularity(&self) -> usize {
        self.config.granularity
    }

    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate
    }

    /// Frames processed since the last reset.
    pub fn sample_time(&self) -> u64 {
        self.sample_time
    }

    /// Busy voices after the last processed block.
    pub fn active_voice_count(&self) -> usize {
        self.voices.active_count()
    }

    /// One character per voice slot, `X` busy and `_` idle.
    pub fn voice_status(&self) -> String {
        self.voices.status_string()
    }

    pub fn voices_are_busy(&self) -> bool {
        self.voices.any_busy()
    }

    pub fn pitch_bend(&self) -> f32 {
        self.mods.pitch_bend
    }

    pub fn mod_wheel(&self) -> f32 {
        self.mods.mod_wheel
    }

    pub fn sustain_pedal_down(&self) -> bool {
        self.mods.sustain_down
    }

    /// Key of the most recent trigger in any mode, `None` before the first.
    pub fn previous_key(&self) -> Option<u8> {
        self.allocator.previous_key()
    }

    pub fn held_keys(&self) -> &[KeyPress] {
        self.allocator.keys().held.as_slice()
    }

    pub fn sustained_keys(&self) -> &[KeyPress] {
        self.allocator.keys().sustained.as_slice()
    }

    pub fn velocity_curve(&self) -> &Curve {
        &self.mods.velocity_curve
    }

    pub fn aftertouch_curve(&self) -> &Curve {
        &self.mods.aftertouch_curve
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }
}
