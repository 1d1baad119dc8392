use crate::{
    io::midi::{MidiEvent, PITCH_BEND_CENTER},
    synth::message::{ControlChange, SynthEvent},
};

pub const CC_MOD_WHEEL: u8 = 1;
pub const CC_SUSTAIN: u8 = 64;
pub const CC_ALL_NOTES_OFF: u8 = 123;

/// Map a decoded MIDI message onto a synth event.
///
/// The channel is ignored: the synth plays everything it is given. Program
/// changes have no meaning to the voice engine and map to `None`.
pub fn midi_to_event(midi: MidiEvent) -> Option<SynthEvent> {
    let event = match midi {
        MidiEvent::NoteOn { key, velocity, .. } => SynthEvent::NoteOn {
            note: key,
            velocity,
        },
        MidiEvent::NoteOff { key, velocity, .. } => SynthEvent::NoteOff {
            note: key,
            velocity,
        },
        MidiEvent::PolyPressure { key, pressure, .. } => SynthEvent::PolyAftertouch {
            note: key,
            value: pressure,
        },
        MidiEvent::ChannelPressure { pressure, .. } => {
            SynthEvent::ChannelAftertouch { value: pressure }
        }
        MidiEvent::PitchBend { value, .. } => SynthEvent::PitchBend {
            value: (value as f32 / PITCH_BEND_CENTER as f32).clamp(-1.0, 1.0),
        },
        MidiEvent::ControlChange {
            controller, value, ..
        } => {
            let norm = value as f32 / 127.0;
            SynthEvent::ControlChange(match controller {
                CC_MOD_WHEEL => ControlChange::ModWheel(norm),
                CC_SUSTAIN => ControlChange::Sustain(norm),
                CC_ALL_NOTES_OFF => ControlChange::AllNotesOff,
                _ => ControlChange::Other {
                    controller,
                    value: norm,
                },
            })
        }
        MidiEvent::ProgramChange { .. } => return None,
    };

    Some(event)
}

/// Convert a (possibly fractional, post-tuning) MIDI pitch to Hz.
/// A4 = 440 Hz = MIDI note 69
pub fn midi_note_to_freq(pitch: f32) -> f32 {
    440.0 * 2.0_f32.powf((pitch - 69.0) / 12.0)
}
