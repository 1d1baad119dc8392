use crate::synth::voice::Voice;

/// Factory for creating voices with a specific patch/sound design
///
/// Configure the sound once, then let [`crate::PolySynth::with_factory`] fill
/// its pool with identical voices.
pub trait VoiceFactory {
    type Voice: Voice + 'static;

    fn create_voice(&self) -> Self::Voice;
}

impl<F, T> VoiceFactory for F
where
    F: Fn() -> T,
    T: Voice + 'static,
{
    type Voice = T;

    fn create_voice(&self) -> Self::Voice {
        self()
    }
}
