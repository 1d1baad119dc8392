use crate::KEY_COUNT;

/// A pressed key and its normalised velocity.
///
/// Two presses are equal when they share a key; velocity is ignored so that
/// membership checks find a key however hard it was struck.
#[derive(Debug, Clone, Copy)]
pub struct KeyPress {
    pub key: u8,
    pub velocity: f32,
}

impl KeyPress {
    pub fn new(key: u8, velocity: f32) -> Self {
        Self { key, velocity }
    }
}

impl PartialEq for KeyPress {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for KeyPress {}

/// Insertion-ordered list of key presses without duplicates.
///
/// Storage is reserved for the whole key space up front, so pushes never
/// reallocate on the audio thread.
#[derive(Debug, Clone)]
pub struct KeyList {
    keys: Vec<KeyPress>,
}

impl KeyList {
    pub fn new() -> Self {
        Self {
            keys: Vec::with_capacity(KEY_COUNT),
        }
    }

    pub fn contains(&self, press: &KeyPress) -> bool {
        self.keys.contains(press)
    }

    /// Append unless the key is already present. Returns true if added.
    pub fn push(&mut self, press: KeyPress) -> bool {
        if self.contains(&press) {
            return false;
        }
        self.keys.push(press);
        true
    }

    /// Remove the first entry for `key`, keeping the order of the rest.
    pub fn remove(&mut self, key: u8) -> Option<KeyPress> {
        let index = self.keys.iter().position(|press| press.key == key)?;
        Some(self.keys.remove(index))
    }

    /// Make `press` the only entry.
    pub fn replace_with(&mut self, press: KeyPress) {
        self.keys.clear();
        self.keys.push(press);
    }

    /// Most recently added entry.
    pub fn last(&self) -> Option<KeyPress> {
        self.keys.last().copied()
    }

    pub fn retain(&mut self, f: impl FnMut(&KeyPress) -> bool) {
        self.keys.retain(f);
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn as_slice(&self) -> &[KeyPress] {
        &self.keys
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyPress> {
        self.keys.iter()
    }
}

impl Default for KeyList {
    fn default() -> Self {
        Self::new()
    }
}

/// Keys physically held, and keys still sounding (held or kept alive by the
/// sustain pedal).
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    pub held: KeyList,
    pub sustained: KeyList,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.held.clear();
        self.sustained.clear();
    }
}
