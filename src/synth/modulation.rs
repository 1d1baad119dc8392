#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{engine::error::ConfigError, KEY_COUNT};

/// 128-entry lookup table mapping a 7-bit controller value to another.
///
/// Used for velocity and aftertouch response. Identity by default; the table
/// is plain data so the host can edit, store and restore it.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(into = "Vec<i32>", try_from = "Vec<i32>")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Curve {
    values: [i32; KEY_COUNT],
}

impl Curve {
    pub fn identity() -> Self {
        Self::from_fn(|i| i as i32)
    }

    /// Build a table from `f(index)`.
    pub fn from_fn(mut f: impl FnMut(usize) -> i32) -> Self {
        let mut values = [0; KEY_COUNT];
        for (i, value) in values.iter_mut().enumerate() {
            *value = f(i);
        }
        Self { values }
    }

    /// Power-law response: `gamma > 1` softens, `gamma < 1` hardens.
    pub fn power(gamma: f32) -> Self {
        Self::from_fn(|i| {
            let x = i as f32 / 127.0;
            (x.powf(gamma) * 127.0).round() as i32
        })
    }

    pub fn lookup(&self, value: u8) -> i32 {
        self.values[value as usize & 0x7F]
    }

    pub fn values(&self) -> &[i32; KEY_COUNT] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [i32; KEY_COUNT] {
        &mut self.values
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Curve> for Vec<i32> {
    fn from(curve: Curve) -> Self {
        curve.values.to_vec()
    }
}

impl TryFrom<Vec<i32>> for Curve {
    type Error = ConfigError;

    fn try_from(values: Vec<i32>) -> Result<Self, Self::Error> {
        let values: [i32; KEY_COUNT] =
            values
                .try_into()
                .map_err(|values: Vec<i32>| ConfigError::CurveLength {
                    expected: KEY_COUNT,
                    actual: values.len(),
                })?;

        if let Some((index, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !(0..=127).contains(*v))
        {
            return Err(ConfigError::CurveValue { index, value });
        }

        Ok(Self { values })
    }
}

/// Performance state shared by every voice.
#[derive(Debug, Clone)]
pub struct ModState {
    /// -1.0..=1.0
    pub pitch_bend: f32,
    /// 0.0..=1.0
    pub mod_wheel: f32,
    pub sustain_down: bool,
    pub velocity_curve: Curve,
    pub aftertouch_curve: Curve,
}

impl ModState {
    pub fn new() -> Self {
        Self {
            pitch_bend: 0.0,
            mod_wheel: 0.0,
            sustain_down: false,
            velocity_curve: Curve::identity(),
            aftertouch_curve: Curve::identity(),
        }
    }

    /// Velocity through the curve, clamped to 1..=127, as 0.0..=1.0.
    ///
    /// The clamp means a curve can never turn a note-on into a silent
    /// trigger.
    pub fn velocity_level(&self, velocity: u8) -> f32 {
        self.velocity_curve.lookup(velocity).clamp(1, 127) as f32 / 127.0
    }

    /// Aftertouch through the curve, as 0.0..=1.0.
    pub fn aftertouch_level(&self, pressure: u8) -> f32 {
        self.aftertouch_curve.lookup(pressure).clamp(0, 127) as f32 / 127.0
    }
}

impl Default for ModState {
    fn default() -> Self {
        Self::new()
    }
}
