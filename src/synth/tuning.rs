use crate::KEY_COUNT;

/// Maps a played key to the MIDI pitch a voice should sound.
///
/// Swap in a custom implementation for microtonal tunings.
pub trait PitchMap: Send {
    /// `offset` is the synth's transposition in semitones.
    fn adjusted_pitch(&self, key: u8, offset: f32) -> f32;
}

/// Twelve-tone equal temperament: the key number plus the offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTuning;

impl PitchMap for StandardTuning {
    fn adjusted_pitch(&self, key: u8, offset: f32) -> f32 {
        key as f32 + offset
    }
}

/// Explicit per-key pitch table, e.g. loaded from a scale file.
#[derive(Debug, Clone)]
pub struct TuningTable {
    pitches: [f32; KEY_COUNT],
}

impl TuningTable {
    pub fn new(pitches: [f32; KEY_COUNT]) -> Self {
        Self { pitches }
    }

    /// Equal division of an interval of `period` semitones into `steps`,
    /// anchored so that `root` keeps its standard pitch.
    pub fn equal_division(steps: usize, period: f32, root: u8) -> Self {
        let step = period / steps.max(1) as f32;
        let mut pitches = [0.0; KEY_COUNT];
        for (key, pitch) in pitches.iter_mut().enumerate() {
            *pitch = root as f32 + (key as f32 - root as f32) * step;
        }
        Self { pitches }
    }
}

impl PitchMap for TuningTable {
    fn adjusted_pitch(&self, key: u8, offset: f32) -> f32 {
        self.pitches[key as usize & 0x7F] + offset
    }
}
