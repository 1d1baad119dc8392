use crate::{
    engine::error::ConfigError,
    synth::voice::{ProcessCtx, Voice, VoiceSlot},
    MAX_VOICES,
};

/// Fixed-capacity set of voices owned by the synth.
///
/// Only the first `limit` slots take part in allocation and processing; the
/// rest stay pooled so the voice count can grow again without rebuilding
/// voices.
pub struct VoicePool {
    slots: Vec<VoiceSlot>,
    limit: usize,
    /// Bit `i` set = slot `i` was busy after the last block.
    status: u32,
}

impl VoicePool {
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(MAX_VOICES),
            limit: MAX_VOICES,
            status: 0,
        }
    }

    /// Take ownership of a voice. Returns its slot index.
    pub fn add(&mut self, voice: Box<dyn Voice>) -> Result<usize, ConfigError> {
        if self.slots.len() >= MAX_VOICES {
            return Err(ConfigError::TooManyVoices {
                requested: self.slots.len() + 1,
                max: MAX_VOICES,
            });
        }
        self.slots.push(VoiceSlot::new(voice));
        Ok(self.slots.len() - 1)
    }

    /// Drop every pooled voice.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.status = 0;
    }

    /// Voices taking part in allocation: the pooled voices, capped at the
    /// active voice count.
    pub fn len(&self) -> usize {
        self.slots.len().min(self.limit)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every voice that has been added, active or not.
    pub fn pooled(&self) -> usize {
        self.slots.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the active voice count. Hard-kills every voice first; call
    /// between blocks only.
    pub fn set_limit(&mut self, limit: usize) {
        debug_assert!(
            limit > 0 && limit <= MAX_VOICES,
            "active voice count must be in 1..={MAX_VOICES}"
        );
        self.kill_all(false);
        self.limit = limit.clamp(1, MAX_VOICES);
    }

    /// Panics if `index` is out of range.
    pub fn get(&self, index: usize) -> &VoiceSlot {
        &self.slots[..self.len()][index]
    }

    /// Panics if `index` is out of range.
    pub fn get_mut(&mut self, index: usize) -> &mut VoiceSlot {
        let len = self.len();
        &mut self.slots[..len][index]
    }

    pub fn first(&self) -> Option<&VoiceSlot> {
        self.slots[..self.len()].first()
    }

    /// Slot index of a particular voice instance.
    pub fn index_of(&self, voice: &dyn Voice) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| std::ptr::addr_eq(slot.voice(), voice))
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoiceSlot> {
        self.slots[..self.len()].iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut VoiceSlot> {
        let len = self.len();
        self.slots[..len].iter_mut()
    }

    /// First voice bound to `key`.
    pub fn voice_for_key(&self, key: u8) -> Option<usize> {
        self.iter().position(|slot| slot.state.key == Some(key))
    }

    pub fn any_busy(&self) -> bool {
        self.iter().any(VoiceSlot::is_busy)
    }

    /// Release and detach every busy voice playing `key`.
    pub fn stop_key(&mut self, key: u8) {
        for slot in self.iter_mut() {
            if slot.state.key == Some(key) && slot.is_busy() {
                slot.stop();
            }
        }
    }

    /// Release and detach every busy voice.
    pub fn release_all(&mut self) {
        for slot in self.iter_mut().filter(|slot| slot.is_busy()) {
            slot.stop();
        }
    }

    /// Kill and detach every voice, busy or not.
    pub fn kill_all(&mut self, soft: bool) {
        for slot in self.iter_mut() {
            slot.kill(soft);
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for slot in self.slots.iter_mut() {
            slot.set_sample_rate(sample_rate);
        }
    }

    /// Render every busy voice over one sub-block.
    pub fn process(&mut self, ctx: &ProcessCtx, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        for slot in self.iter_mut() {
            if slot.is_busy() {
                slot.process(ctx, inputs, outputs);
            }
        }
    }

    /// Recompute the busy bitset. Returns true if any voice is busy.
    pub fn refresh_status(&mut self) -> bool {
        self.status = self
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_busy())
            .fold(0, |bits, (i, _)| bits | (1 << i));
        self.status != 0
    }

    /// Busy voices as of the last status refresh.
    pub fn active_count(&self) -> usize {
        self.status.count_ones() as usize
    }

    pub fn status_bits(&self) -> u32 {
        self.status
    }

    /// One character per slot, slot 0 first: `X` busy, `_` idle.
    pub fn status_string(&self) -> String {
        (0..MAX_VOICES)
            .map(|i| if self.status & (1 << i) != 0 { 'X' } else { '_' })
            .collect()
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new()
    }
}
