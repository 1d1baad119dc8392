#[cfg(feature = "rtrb")]
use rtrb::Consumer;

/// A performance event as the synth understands it.
///
/// Velocities and aftertouch stay 7-bit because they are looked up through
/// the velocity/aftertouch curves; continuous controllers are normalised.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SynthEvent {
    /// A note-on with velocity 0 is treated as a note-off.
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    /// Pitch wheel position in -1.0..=1.0.
    PitchBend { value: f32 },
    ChannelAftertouch { value: u8 },
    PolyAftertouch { note: u8, value: u8 },
    ControlChange(ControlChange),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ControlChange {
    /// 0.0..=1.0
    ModWheel(f32),
    /// Pedal is down when the value is >= 0.5.
    Sustain(f32),
    AllNotesOff,
    Other { controller: u8, value: f32 },
}

impl SynthEvent {
    pub fn note_on(note: u8, velocity: u8) -> Self {
        debug_assert!(note < 128 && velocity < 128, "note-on outside MIDI range");
        SynthEvent::NoteOn { note, velocity }
    }

    pub fn note_off(note: u8) -> Self {
        debug_assert!(note < 128, "note-off outside MIDI range");
        SynthEvent::NoteOff { note, velocity: 0 }
    }

    /// Every key, velocity and pressure fits in 7 bits.
    pub fn in_midi_range(&self) -> bool {
        match *self {
            SynthEvent::NoteOn { note, velocity } | SynthEvent::NoteOff { note, velocity } => {
                note < 128 && velocity < 128
            }
            SynthEvent::PolyAftertouch { note, value } => note < 128 && value < 128,
            SynthEvent::ChannelAftertouch { value } => value < 128,
            SynthEvent::PitchBend { .. } | SynthEvent::ControlChange(_) => true,
        }
    }

    pub fn sustain(down: bool) -> Self {
        SynthEvent::ControlChange(ControlChange::Sustain(if down { 1.0 } else { 0.0 }))
    }

    pub fn all_notes_off() -> Self {
        SynthEvent::ControlChange(ControlChange::AllNotesOff)
    }

    /// Place this event `offset` frames into the current block.
    pub fn at(self, offset: usize) -> TimedEvent {
        TimedEvent {
            offset,
            event: self,
        }
    }
}

/// An event tagged with its sample offset from the start of the block.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TimedEvent {
    pub offset: usize,
    pub event: SynthEvent,
}

/// Source of events handed over from another thread (MIDI input, UI).
pub trait MessageReceiver {
    fn pop(&mut self) -> Option<TimedEvent>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<TimedEvent> {
    fn pop(&mut self) -> Option<TimedEvent> {
        Consumer::pop(self).ok()
    }
}
