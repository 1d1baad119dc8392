/// Rejected configuration. Only produced on the control path, never while
/// processing audio.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one voice must be active")]
    NoVoices,
    #[error("{requested} voices requested, at most {max} are supported")]
    TooManyVoices { requested: usize, max: usize },
    #[error("unison count {requested} must be between 1 and the active voice count {voices}")]
    UnisonOutOfRange { requested: usize, voices: usize },
    #[error("granularity must be at least one frame")]
    ZeroGranularity,
    #[error("block size {requested} exceeds the maximum of {max} frames")]
    BlockTooLarge { requested: usize, max: usize },
    #[error("sample rate {0} Hz is not a positive finite number")]
    InvalidSampleRate(f32),
    #[error("a curve needs exactly {expected} entries, got {actual}")]
    CurveLength { expected: usize, actual: usize },
    #[error("curve entry {index} is {value}, expected 0..=127")]
    CurveValue { index: usize, value: i32 },
}
