//! The performance voicemon plays: raw MIDI bytes at absolute frames.
//!
//! Covers a chord, voice stealing, a legato line and the sustain pedal.

const NOTE_ON: u8 = 0x90;
const NOTE_OFF: u8 = 0x80;
const CONTROL_CHANGE: u8 = 0xB0;
const SUSTAIN: u8 = 64;

/// (frame, message) pairs in time order.
pub fn performance(sample_rate: f32) -> Vec<(usize, Vec<u8>)> {
    let beat = (sample_rate * 0.25) as usize;
    let mut events = Vec::new();
    let mut at = |beats: usize, bytes: &[u8]| events.push((beats * beat, bytes.to_vec()));

    // C major chord, held for two beats
    for key in [60, 64, 67] {
        at(0, &[NOTE_ON, key, 100]);
    }
    for key in [60, 64, 67] {
        at(2, &[NOTE_OFF, key, 0]);
    }

    // overlapping line: each note starts before the previous one ends
    for (i, key) in [62u8, 64, 65, 67, 69, 71, 72, 74, 76, 77].into_iter().enumerate() {
        at(3 + i, &[NOTE_ON, key, 90]);
        at(4 + i, &[NOTE_OFF, key, 0]);
    }

    // sustain pedal holds a released chord
    at(15, &[CONTROL_CHANGE, SUSTAIN, 127]);
    for key in [48, 55, 60] {
        at(15, &[NOTE_ON, key, 80]);
        at(16, &[NOTE_OFF, key, 0]);
    }
    at(19, &[CONTROL_CHANGE, SUSTAIN, 0]);

    events.sort_by_key(|(frame, _)| *frame);
    events
}
