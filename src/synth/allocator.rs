//! Note allocation: which voice plays which key.
//!
//! Poly mode hands every note-on to a free voice, stealing the oldest one
//! when the pool is full. The mono modes drive the first `unison` voices
//! with the most recent note; legato skips the re-attack while the previous
//! note is still sounding. The sustain pedal keeps released keys in the
//! sustained list until the pedal comes up.

use crate::{
    engine::config::{AftertouchMode, EngineConfig, PolyMode},
    synth::{
        keys::{KeyPress, KeyState},
        modulation::ModState,
        pool::VoicePool,
        tuning::{PitchMap, StandardTuning},
    },
};

/*
Note Allocation
===============

Vocabulary
----------

  held        Keys physically down right now, oldest first. The back of the
              list is the most recent press.

  sustained   Keys still allowed to sound: every held key, plus keys that
              were let go while the sustain pedal was down. In the mono
              modes this is only ever one key.

  start time  Sample time of a voice's last poly trigger. Smaller is older.

  stack index Position of a voice inside a unison stack (0 for the first).


Poly Mode
---------

Each note-on asks for `unison` voices. A voice is picked like this:

  1. the first voice that is not busy, scanning from index 0
  2. otherwise the busy voice with the smallest start time (ties go to
     the lowest index)

  voices   0     1     2     3
  start    40    10    10    70      all busy
  pick           ^                 oldest, and first of the tie

A stolen voice is retriggered over its old note (`is_retrigger = true`), so
it can re-attack from its current level instead of clicking to zero. Even
when every voice started in this very sub-block, one is stolen; the note is
never dropped.


Mono And Legato
---------------

Only the first `unison` voices are used, and every one of them follows the
newest note:

  press 60     free voice     trigger(retrigger = false)
  press 64     busy voice     mono:   trigger(retrigger = true)
                              legato: no trigger, key and pitch move only
  release 64   60 still held  back to 60 (last-note priority)
  release 60   nothing held   release, unless the pedal holds it

Legato only skips the attack while the voice is sounding and not yet
released. A releasing voice gets a fresh attack in both modes.


Sustain Pedal
-------------

While the pedal is down note-offs leave keys in the sustained list and their
voices keep sounding. When it comes up, every sustained key that is not held
any more is released:

  pedal down, press 60, press 64, release 60
      held [64]   sustained [60, 64]
  pedal up
      held [64]   sustained [64]        voice on 60 released
*/

/// Everything an allocation decision reads but does not own.
pub struct NoteCtx<'a> {
    pub config: &'a EngineConfig,
    pub mods: &'a ModState,
    /// Sample time at the start of the current sub-block.
    pub now: u64,
}

pub struct NoteAllocator {
    keys: KeyState,
    previous_key: Option<u8>,
    tuning: Box<dyn PitchMap>,
}

impl NoteAllocator {
    pub fn new() -> Self {
        Self {
            keys: KeyState::new(),
            previous_key: None,
            tuning: Box::new(StandardTuning),
        }
    }

    pub fn set_pitch_map(&mut self, tuning: Box<dyn PitchMap>) {
        self.tuning = tuning;
    }

    pub fn keys(&self) -> &KeyState {
        &self.keys
    }

    /// Key of the most recent trigger, in every poly mode (mono and legato
    /// included).
    pub fn previous_key(&self) -> Option<u8> {
        self.previous_key
    }

    pub fn clear_keys(&mut self) {
        self.keys.clear();
    }

    /// Returns true if any voice was assigned a note.
    pub fn note_on(&mut self, pool: &mut VoicePool, ctx: &NoteCtx, note: u8, velocity: u8) -> bool {
        if velocity == 0 {
            return self.note_off(pool, ctx, note);
        }

        let press = KeyPress::new(note, ctx.mods.velocity_level(velocity));

        match ctx.config.poly_mode {
            PolyMode::Poly => self.trigger_poly(pool, ctx, press),
            PolyMode::Mono | PolyMode::MonoLegato => {
                self.keys.held.push(press);
                // mono modes only ever sustain one note
                self.keys.sustained.replace_with(press);
                self.trigger_mono(pool, ctx, press)
            }
        }
    }

    /// Returns true if a queued note took over the voices (mono modes).
    pub fn note_off(&mut self, pool: &mut VoicePool, ctx: &NoteCtx, note: u8) -> bool {
        // the key is no longer held, whatever the pedal is doing
        self.keys.held.remove(note);

        if ctx.config.poly_mode == PolyMode::Poly {
            if !ctx.mods.sustain_down {
                self.keys.sustained.remove(note);
                pool.stop_key(note);
            }
            return false;
        }

        let current = pool.first().and_then(|slot| slot.state.key);

        if let Some(queued) = self.keys.held.last() {
            // last-note priority
            if current != Some(queued.key) {
                self.keys.sustained.replace_with(queued);
                return self.trigger_mono(pool, ctx, queued);
            }
        } else if ctx.mods.sustain_down {
            // already in the sustained list, nothing to add
            if let Some(queued) = self.keys.sustained.last() {
                if current != Some(queued.key) {
                    return self.trigger_mono(pool, ctx, queued);
                }
            }
        } else {
            pool.stop_key(note);
        }

        false
    }

    /// Pedal came up: stop every sustained key that is no longer held.
    pub fn sustain_released(&mut self, pool: &mut VoicePool) {
        let KeyState { held, sustained } = &mut self.keys;
        sustained.retain(|press| {
            if held.contains(press) {
                return true;
            }
            pool.stop_key(press.key);
            false
        });
    }

    /// Forget every key and kill every voice.
    pub fn all_notes_off(&mut self, pool: &mut VoicePool, soft: bool) {
        self.keys.clear();
        pool.kill_all(soft);
    }

    /// Channel pressure. Ignored unless in channel aftertouch mode.
    pub fn channel_aftertouch(&self, pool: &mut VoicePool, ctx: &NoteCtx, pressure: u8) {
        if ctx.config.aftertouch_mode != AftertouchMode::Channel {
            return;
        }
        let level = ctx.mods.aftertouch_level(pressure);
        for slot in pool.iter_mut() {
            slot.state.aftertouch = level;
        }
    }

    /// Key pressure. Ignored unless in per-key aftertouch mode.
    pub fn poly_aftertouch(&self, pool: &mut VoicePool, ctx: &NoteCtx, note: u8, pressure: u8) {
        if ctx.config.aftertouch_mode != AftertouchMode::PerKey {
            return;
        }
        let level = ctx.mods.aftertouch_level(pressure);
        for slot in pool.iter_mut().filter(|slot| slot.state.key == Some(note)) {
            slot.state.aftertouch = level;
        }
    }

    fn trigger_poly(&mut self, pool: &mut VoicePool, ctx: &NoteCtx, press: KeyPress) -> bool {
        self.keys.held.push(press);
        self.keys.sustained.push(press);

        let pitch = self.tuning.adjusted_pitch(press.key, ctx.config.note_offset);
        let unison = ctx.config.unison_voices.min(pool.len());
        let mut assigned = false;

        for stack_index in 0..unison {
            let Some(index) = find_voice(pool) else {
                break;
            };

            let slot = pool.get_mut(index);
            let was_busy = slot.is_busy();
            slot.state.start_time = Some(ctx.now);
            slot.state.key = Some(press.key);
            slot.state.stack_index = stack_index;
            slot.state.base_pitch = pitch;
            slot.state.aftertouch = 0.0;
            // a busy voice is being stolen: re-attack it
            slot.trigger(press.velocity, was_busy);
            assigned = true;
        }

        if assigned {
            self.previous_key = Some(press.key);
        }
        assigned
    }

    fn trigger_mono(&mut self, pool: &mut VoicePool, ctx: &NoteCtx, press: KeyPress) -> bool {
        let pitch = self.tuning.adjusted_pitch(press.key, ctx.config.note_offset);
        let legato = ctx.config.poly_mode == PolyMode::MonoLegato;
        let mut assigned = false;

        for (stack_index, slot) in pool
            .iter_mut()
            .take(ctx.config.unison_voices)
            .enumerate()
        {
            slot.state.key = Some(press.key);
            slot.state.stack_index = stack_index;
            slot.state.base_pitch = pitch;
            slot.state.aftertouch = 0.0;

            if !slot.is_busy() {
                slot.trigger(press.velocity, false);
            } else if !legato || slot.is_released() {
                slot.trigger(press.velocity, true);
            }
            // else: legato over a sounding voice, pitch follows without
            // a new attack
            assigned = true;
        }

        if assigned {
            self.previous_key = Some(press.key);
        }
        assigned
    }
}

impl Default for NoteAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// First free voice, otherwise the one triggered longest ago. Ties go to the
/// lowest index.
fn find_voice(pool: &VoicePool) -> Option<usize> {
    pool.iter().position(|slot| !slot.is_busy()).or_else(|| {
        pool.iter()
            .enumerate()
            .min_by_key(|(_, slot)| slot.state.start_time)
            .map(|(index, _)| index)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::testing::{Call, RecordingVoice, VoiceLog};

    struct Rig {
        pool: VoicePool,
        logs: Vec<VoiceLog>,
        alloc: NoteAllocator,
        config: EngineConfig,
        mods: ModState,
        now: u64,
    }

    impl Rig {
        fn new(voices: usize, mode: PolyMode) -> Self {
            let mut pool = VoicePool::new();
            let mut logs = Vec::new();
            for _ in 0..voices {
                let (voice, log) = RecordingVoice::with_log();
                pool.add(Box::new(voice)).unwrap();
                logs.push(log);
            }
            Self {
                pool,
                logs,
                alloc: NoteAllocator::new(),
                config: EngineConfig::default()
                    .with_active_voices(voices)
                    .with_poly_mode(mode),
                mods: ModState::new(),
                now: 0,
            }
        }

        fn on(&mut self, note: u8) -> bool {
            let ctx = NoteCtx {
                config: &self.config,
                mods: &self.mods,
                now: self.now,
            };
            self.alloc.note_on(&mut self.pool, &ctx, note, 100)
        }

        fn off(&mut self, note: u8) {
            let ctx = NoteCtx {
                config: &self.config,
                mods: &self.mods,
                now: self.now,
            };
            self.alloc.note_off(&mut self.pool, &ctx, note);
        }

        fn pedal(&mut self, down: bool) {
            self.mods.sustain_down = down;
            if !down {
                self.alloc.sustain_released(&mut self.pool);
            }
        }

        fn key_of(&self, voice: usize) -> Option<u8> {
            self.pool.get(voice).state.key
        }

        fn held(&self) -> Vec<u8> {
            self.alloc.keys().held.iter().map(|p| p.key).collect()
        }

        fn sustained(&self) -> Vec<u8> {
            self.alloc.keys().sustained.iter().map(|p| p.key).collect()
        }
    }

    #[test]
    fn poly_uses_free_voices_in_order() {
        let mut rig = Rig::new(4, PolyMode::Poly);
        rig.on(60);
        rig.on(64);

        assert_eq!(rig.key_of(0), Some(60));
        assert_eq!(rig.key_of(1), Some(64));
        assert_eq!(rig.key_of(2), None);
        assert_eq!(rig.alloc.previous_key(), Some(64));
    }

    #[test]
    fn poly_steals_oldest_voice() {
        let mut rig = Rig::new(2, PolyMode::Poly);
        rig.now = 0;
        rig.on(60);
        rig.now = 100;
        rig.on(64);
        rig.now = 200;
        rig.on(67);

        assert_eq!(rig.key_of(0), Some(67));
        assert_eq!(rig.key_of(1), Some(64));
        assert_eq!(
            rig.logs[0].triggers().last(),
            Some(&Call::Trigger {
                level: 100.0 / 127.0,
                retrigger: true,
                key: Some(67),
                pitch: 67.0,
                stack_index: 0
            })
        );
        assert_eq!(rig.logs[1].trigger_count(), 1);
    }

    #[test]
    fn steal_prefers_oldest_even_at_higher_index() {
        let mut rig = Rig::new(2, PolyMode::Poly);
        rig.now = 0;
        rig.on(60);
        rig.now = 10;
        rig.on(62);
        rig.now = 20;
        rig.on(64); // steals voice 0
        rig.now = 30;
        rig.on(65); // voice 1 is now the oldest

        assert_eq!(rig.key_of(0), Some(64));
        assert_eq!(rig.key_of(1), Some(65));
    }

    #[test]
    fn steal_ties_go_to_lowest_index() {
        let mut rig = Rig::new(3, PolyMode::Poly);
        rig.now = 50;
        rig.on(60);
        rig.on(62);
        rig.on(64);
        rig.now = 80;
        rig.on(67);

        assert_eq!(rig.key_of(0), Some(67));
        assert_eq!(rig.key_of(1), Some(62));
        assert_eq!(rig.key_of(2), Some(64));
    }

    #[test]
    fn unison_fans_out_with_distinct_stack_indices() {
        let mut rig = Rig::new(8, PolyMode::Poly);
        rig.config.unison_voices = 4;
        rig.on(60);

        let mut stack = Vec::new();
        for voice in 0..4 {
            let slot = rig.pool.get(voice);
            assert_eq!(slot.state.key, Some(60));
            assert_eq!(slot.state.base_pitch, 60.0);
            stack.push(slot.state.stack_index);
        }
        assert_eq!(stack, vec![0, 1, 2, 3]);
        assert_eq!(rig.key_of(4), None);
    }

    #[test]
    fn note_offset_transposes_pitch() {
        let mut rig = Rig::new(2, PolyMode::Poly);
        rig.config.note_offset = -12.0;
        rig.on(60);
        assert_eq!(rig.pool.get(0).state.base_pitch, 48.0);
        assert_eq!(rig.key_of(0), Some(60));
    }

    #[test]
    fn custom_pitch_map_is_used() {
        struct Fixed;
        impl PitchMap for Fixed {
            fn adjusted_pitch(&self, _key: u8, _offset: f32) -> f32 {
                42.5
            }
        }

        let mut rig = Rig::new(2, PolyMode::Poly);
        rig.alloc.set_pitch_map(Box::new(Fixed));
        rig.on(60);
        assert_eq!(rig.pool.get(0).state.base_pitch, 42.5);
    }

    #[test]
    fn poly_note_off_releases_and_unassigns() {
        let mut rig = Rig::new(2, PolyMode::Poly);
        rig.on(60);
        rig.off(60);

        assert_eq!(rig.logs[0].release_count(), 1);
        assert_eq!(rig.key_of(0), None);
        assert_eq!(rig.pool.get(0).state.previous_key, Some(60));
        assert!(rig.held().is_empty());
        assert!(rig.sustained().is_empty());
    }

    #[test]
    fn zero_velocity_is_note_off() {
        let mut rig = Rig::new(2, PolyMode::Poly);
        rig.on(60);
        let ctx = NoteCtx {
            config: &rig.config,
            mods: &rig.mods,
            now: 0,
        };
        rig.alloc.note_on(&mut rig.pool, &ctx, 60, 0);

        assert_eq!(rig.logs[0].release_count(), 1);
        assert!(rig.held().is_empty());
    }

    #[test]
    fn repressing_held_key_retriggers_without_duplicating() {
        let mut rig = Rig::new(4, PolyMode::Poly);
        rig.on(60);
        rig.on(60);

        assert_eq!(rig.held(), vec![60]);
        assert_eq!(rig.sustained(), vec![60]);
        // second press lands on the next free voice
        assert_eq!(rig.key_of(1), Some(60));
    }

    #[test]
    fn sustain_keeps_released_key_sounding() {
        let mut rig = Rig::new(2, PolyMode::Poly);
        rig.pedal(true);
        rig.on(60);
        rig.off(60);

        assert!(rig.pool.get(0).is_busy());
        assert_eq!(rig.logs[0].release_count(), 0);
        assert!(rig.held().is_empty());
        assert_eq!(rig.sustained(), vec![60]);

        rig.pedal(false);
        assert_eq!(rig.logs[0].release_count(), 1);
        assert!(rig.sustained().is_empty());
    }

    #[test]
    fn pedal_up_spares_keys_still_held() {
        let mut rig = Rig::new(4, PolyMode::Poly);
        rig.pedal(true);
        rig.on(60);
        rig.on(64);
        rig.off(60);
        rig.pedal(false);

        assert_eq!(rig.sustained(), vec![64]);
        assert_eq!(rig.key_of(0), None);
        assert_eq!(rig.key_of(1), Some(64));
        assert_eq!(rig.logs[1].release_count(), 0);
    }

    #[test]
    fn held_keys_stay_sustained_under_pedal() {
        let mut rig = Rig::new(4, PolyMode::Poly);
        rig.pedal(true);
        let script = [
            (60, true),
            (62, true),
            (60, false),
            (64, true),
            (62, false),
            (60, true),
        ];
        for (note, press) in script {
            if press {
                rig.on(note);
            } else {
                rig.off(note);
            }
            let sustained = rig.sustained();
            for key in rig.held() {
                assert!(sustained.contains(&key), "held key {key} not sustained");
            }
        }
    }

    #[test]
    fn held_keys_stay_sustained_for_every_short_sequence() {
        // 0..6: note on/off for three keys, 6: pedal down, 7: pedal up
        const ACTIONS: usize = 8;
        const STEPS: u32 = 6;
        const KEYS: [u8; 3] = [60, 62, 64];

        for sequence in 0..ACTIONS.pow(STEPS) {
            // two voices, so three keys also exercise stealing
            let mut rig = Rig::new(2, PolyMode::Poly);
            let mut code = sequence;

            for step in 0..STEPS {
                match code % ACTIONS {
                    6 => rig.pedal(true),
                    7 => rig.pedal(false),
                    action if action % 2 == 0 => {
                        rig.on(KEYS[action / 2]);
                    }
                    action => rig.off(KEYS[action / 2]),
                }
                code /= ACTIONS;
                rig.now += 1;

                let sustained = rig.sustained();
                for key in rig.held() {
                    assert!(
                        sustained.contains(&key),
                        "sequence {sequence} step {step}: held key {key} not sustained"
                    );
                }
            }
        }
    }

    #[test]
    fn same_sub_block_notes_still_steal() {
        let mut rig = Rig::new(2, PolyMode::Poly);
        rig.now = 0;
        rig.on(60);
        rig.on(64);
        // every voice started at `now`: the lowest index goes rather than
        // dropping the note
        assert!(rig.on(67));

        assert_eq!(rig.key_of(0), Some(67));
        assert_eq!(rig.key_of(1), Some(64));
        assert_eq!(rig.alloc.previous_key(), Some(67));
    }

    #[test]
    fn all_notes_off_clears_everything() {
        let mut rig = Rig::new(4, PolyMode::Poly);
        rig.pedal(true);
        rig.on(60);
        rig.on(62);
        rig.alloc.all_notes_off(&mut rig.pool, true);

        assert!(rig.held().is_empty());
        assert!(rig.sustained().is_empty());
        assert!(!rig.pool.any_busy());
        assert!(rig.logs[0].calls().contains(&Call::Kill { soft: true }));
    }

    #[test]
    fn legato_glides_without_retrigger() {
        let mut rig = Rig::new(2, PolyMode::MonoLegato);
        rig.on(60);
        rig.on(64);

        assert_eq!(rig.logs[0].trigger_count(), 1);
        assert_eq!(rig.key_of(0), Some(64));
        assert_eq!(rig.pool.get(0).state.base_pitch, 64.0);
        assert_eq!(rig.sustained(), vec![64]);
        assert_eq!(rig.held(), vec![60, 64]);
    }

    #[test]
    fn legato_reattacks_a_releasing_voice() {
        let mut rig = Rig::new(2, PolyMode::MonoLegato);
        rig.on(60);
        rig.off(60); // voice 0 now releasing
        rig.on(64);

        let triggers = rig.logs[0].triggers();
        assert_eq!(triggers.len(), 2);
        assert!(matches!(
            triggers[1],
            Call::Trigger {
                retrigger: true,
                key: Some(64),
                ..
            }
        ));
    }

    #[test]
    fn mono_retriggers_every_note() {
        let mut rig = Rig::new(2, PolyMode::Mono);
        rig.on(60);
        rig.on(64);

        let triggers = rig.logs[0].triggers();
        assert_eq!(triggers.len(), 2);
        assert!(matches!(triggers[0], Call::Trigger { retrigger: false, .. }));
        assert!(matches!(triggers[1], Call::Trigger { retrigger: true, .. }));
        assert_eq!(rig.logs[1].trigger_count(), 0);
    }

    #[test]
    fn mono_modes_record_previous_key() {
        for mode in [PolyMode::Mono, PolyMode::MonoLegato] {
            let mut rig = Rig::new(2, mode);
            assert_eq!(rig.alloc.previous_key(), None);
            rig.on(60);
            assert_eq!(rig.alloc.previous_key(), Some(60));
            rig.on(64);
            assert_eq!(rig.alloc.previous_key(), Some(64));
        }
    }

    #[test]
    fn mono_returns_to_last_held_note() {
        let mut rig = Rig::new(2, PolyMode::Mono);
        rig.on(60);
        rig.on(62);
        rig.on(64);
        rig.off(64);

        assert_eq!(rig.key_of(0), Some(62));
        assert_eq!(rig.sustained(), vec![62]);
        assert_eq!(rig.logs[0].trigger_count(), 4);

        // releasing a key that is not sounding changes nothing audible
        rig.off(60);
        assert_eq!(rig.key_of(0), Some(62));
        assert_eq!(rig.logs[0].trigger_count(), 4);
    }

    #[test]
    fn mono_last_release_stops_voice() {
        let mut rig = Rig::new(2, PolyMode::Mono);
        rig.on(60);
        rig.off(60);

        assert_eq!(rig.logs[0].release_count(), 1);
        assert_eq!(rig.key_of(0), None);
    }

    #[test]
    fn mono_pedal_keeps_last_note_sounding() {
        let mut rig = Rig::new(2, PolyMode::Mono);
        rig.pedal(true);
        rig.on(60);
        rig.on(64);
        // back to the still-held 60
        rig.off(64);
        assert_eq!(rig.key_of(0), Some(60));
        assert_eq!(rig.sustained(), vec![60]);

        // nothing held, pedal down: 60 is already the sounding note
        rig.off(60);
        assert_eq!(rig.key_of(0), Some(60));
        assert_eq!(rig.logs[0].release_count(), 0);
        assert_eq!(rig.logs[0].trigger_count(), 3);

        rig.pedal(false);
        assert_eq!(rig.logs[0].release_count(), 1);
        assert!(rig.sustained().is_empty());
    }

    #[test]
    fn mono_pedal_with_nothing_sustained_is_a_no_op() {
        let mut rig = Rig::new(2, PolyMode::Mono);
        rig.pedal(true);
        // note-off without any prior note-on
        rig.off(60);

        assert!(rig.held().is_empty());
        assert!(rig.sustained().is_empty());
        assert!(rig.logs[0].calls().is_empty());
    }

    #[test]
    fn mono_unison_retargets_every_stacked_voice() {
        let mut rig = Rig::new(4, PolyMode::Mono);
        rig.config.unison_voices = 3;
        rig.on(60);
        rig.on(67);

        for voice in 0..3 {
            assert_eq!(rig.key_of(voice), Some(67));
            assert_eq!(rig.pool.get(voice).state.stack_index, voice);
            assert_eq!(rig.logs[voice].trigger_count(), 2);
        }
        assert_eq!(rig.key_of(3), None);
    }

    #[test]
    fn aftertouch_follows_mode() {
        let mut rig = Rig::new(3, PolyMode::Poly);
        rig.on(60);
        rig.on(62);
        let ctx = NoteCtx {
            config: &rig.config,
            mods: &rig.mods,
            now: 0,
        };

        // channel mode ignores key pressure
        rig.alloc.poly_aftertouch(&mut rig.pool, &ctx, 60, 127);
        assert_eq!(rig.pool.get(0).state.aftertouch, 0.0);

        rig.alloc.channel_aftertouch(&mut rig.pool, &ctx, 127);
        for slot in rig.pool.iter() {
            assert_eq!(slot.state.aftertouch, 1.0);
        }

        let config = rig.config.with_aftertouch_mode(AftertouchMode::PerKey);
        let ctx = NoteCtx {
            config: &config,
            mods: &rig.mods,
            now: 0,
        };
        rig.alloc.poly_aftertouch(&mut rig.pool, &ctx, 62, 0);
        assert_eq!(rig.pool.get(0).state.aftertouch, 1.0);
        assert_eq!(rig.pool.get(1).state.aftertouch, 0.0);

        rig.alloc.channel_aftertouch(&mut rig.pool, &ctx, 64);
        assert_eq!(rig.pool.get(2).state.aftertouch, 1.0);
    }
}
