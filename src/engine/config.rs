#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    engine::error::ConfigError, DEFAULT_GRANULARITY, DEFAULT_SAMPLE_RATE, MAX_BLOCK_SIZE,
    MAX_VOICES,
};

/// How note-ons are distributed over the voice pool.
///
/// Switching modes does not touch voices that are already sounding.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolyMode {
    /// Every key gets its own voice(s); the oldest voice is stolen when full.
    #[default]
    Poly,
    /// One note at a time, last-note priority, every new note re-attacks.
    Mono,
    /// Like `Mono`, but a new note glides over a still-sounding voice
    /// without re-attacking its envelope.
    MonoLegato,
}

impl PolyMode {
    pub fn is_mono(self) -> bool {
        !matches!(self, PolyMode::Poly)
    }
}

/// Which aftertouch messages reach the voices.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AftertouchMode {
    /// Channel pressure applies to every voice.
    #[default]
    Channel,
    /// Polyphonic key pressure applies to voices playing that key.
    PerKey,
}

/// Engine settings. Only change these between blocks.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub poly_mode: PolyMode,
    pub aftertouch_mode: AftertouchMode,
    /// Voices stacked per note, 1..=active_voices.
    pub unison_voices: usize,
    /// Voices the allocator may use, 1..=MAX_VOICES.
    pub active_voices: usize,
    /// Event quantisation grid and largest sub-block, in frames.
    pub granularity: usize,
    pub sample_rate: f32,
    /// Largest block the host will ask for.
    pub block_size: usize,
    /// Transposition in semitones applied to every key.
    pub note_offset: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poly_mode: PolyMode::Poly,
            aftertouch_mode: AftertouchMode::Channel,
            unison_voices: 1,
            active_voices: MAX_VOICES,
            granularity: DEFAULT_GRANULARITY,
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: 512,
            note_offset: 0.0,
        }
    }
}

impl EngineConfig {
    pub fn with_poly_mode(mut self, mode: PolyMode) -> Self {
        self.poly_mode = mode;
        self
    }

    pub fn with_aftertouch_mode(mut self, mode: AftertouchMode) -> Self {
        self.aftertouch_mode = mode;
        self
    }

    pub fn with_unison_voices(mut self, voices: usize) -> Self {
        self.unison_voices = voices;
        self
    }

    pub fn with_active_voices(mut self, voices: usize) -> Self {
        self.active_voices = voices;
        self
    }

    pub fn with_granularity(mut self, frames: usize) -> Self {
        self.granularity = frames;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_block_size(mut self, frames: usize) -> Self {
        self.block_size = frames;
        self
    }

    pub fn with_note_offset(mut self, semitones: f32) -> Self {
        self.note_offset = semitones;
        self
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.active_voices == 0 {
            return Err(ConfigError::NoVoices);
        }
        if self.active_voices > MAX_VOICES {
            return Err(ConfigError::TooManyVoices {
                requested: self.active_voices,
                max: MAX_VOICES,
            });
        }
        if self.unison_voices == 0 || self.unison_voices > self.active_voices {
            return Err(ConfigError::UnisonOutOfRange {
                requested: self.unison_voices,
                voices: self.active_voices,
            });
        }
        if self.granularity == 0 {
            return Err(ConfigError::ZeroGranularity);
        }
        if self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::BlockTooLarge {
                requested: self.block_size,
                max: MAX_BLOCK_SIZE,
            });
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        Ok(())
    }
}
