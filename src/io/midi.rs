/// A decoded channel-voice MIDI message.
///
/// Data bytes are kept raw (7-bit, pitch bend as a signed 14-bit value
/// centred on zero); normalisation happens in [`crate::io::converter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    PolyPressure { channel: u8, key: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    PitchBend { channel: u8, value: i16 },
}

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const POLY_PRESSURE: u8 = 0xA0;
const CONTROL_CHANGE: u8 = 0xB0;
const PROGRAM_CHANGE: u8 = 0xC0;
const CHANNEL_PRESSURE: u8 = 0xD0;
const PITCH_BEND: u8 = 0xE0;

/// Centre of the 14-bit pitch wheel range.
pub const PITCH_BEND_CENTER: i16 = 8192;

impl MidiEvent {
    /// Decode a status byte plus up to two data bytes.
    ///
    /// Returns `None` for system messages, truncated messages and stray data
    /// bytes. Data bytes are masked to 7 bits.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        if status & 0x80 == 0 {
            return None;
        }

        let channel = status & 0x0F;
        let d0 = data.first().map(|b| b & 0x7F);
        let d1 = data.get(1).map(|b| b & 0x7F);

        let event = match status & 0xF0 {
            NOTE_OFF => MidiEvent::NoteOff {
                channel,
                key: d0?,
                velocity: d1?,
            },
            NOTE_ON => MidiEvent::NoteOn {
                channel,
                key: d0?,
                velocity: d1?,
            },
            POLY_PRESSURE => MidiEvent::PolyPressure {
                channel,
                key: d0?,
                pressure: d1?,
            },
            CONTROL_CHANGE => MidiEvent::ControlChange {
                channel,
                controller: d0?,
                value: d1?,
            },
            PROGRAM_CHANGE => MidiEvent::ProgramChange {
                channel,
                program: d0?,
            },
            CHANNEL_PRESSURE => MidiEvent::ChannelPressure {
                channel,
                pressure: d0?,
            },
            PITCH_BEND => {
                // LSB first, then MSB
                let raw = ((d1? as i16) << 7) | d0? as i16;
                MidiEvent::PitchBend {
                    channel,
                    value: raw - PITCH_BEND_CENTER,
                }
            }
            _ => return None,
        };

        Some(event)
    }

    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::PolyPressure { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::ProgramChange { channel, .. }
            | MidiEvent::ChannelPressure { channel, .. }
            | MidiEvent::PitchBend { channel, .. } => channel,
        }
    }
}
