//! Held-key tracking and chord edge detection

use std::collections::HashSet;

use tracing::trace;

use super::chord::HotkeyChord;

/// Tracks currently held tokens and detects chord completion
///
/// `press` and `release` are the only mutating operations. The trigger
/// key is taken out of the held set as soon as the chord fires, and stays
/// latched until it is physically released, so auto-repeat of a held key
/// never fires the chord a second time.
#[derive(Debug)]
pub struct ChordTracker {
    chord: HotkeyChord,
    held: HashSet<String>,
    latched: HashSet<String>,
}

impl ChordTracker {
    pub fn new(chord: HotkeyChord) -> Self {
        Self {
            chord,
            held: HashSet::new(),
            latched: HashSet::new(),
        }
    }

    pub fn chord(&self) -> &HotkeyChord {
        &self.chord
    }

    /// Record a press, returning `true` when it completes the chord
    pub fn press(&mut self, token: &str) -> bool {
        if self.latched.contains(token) {
            return false;
        }

        self.held.insert(token.to_string());

        if !self.chord.contains(token) || !self.is_satisfied() {
            return false;
        }

        trace!(token, chord = %self.chord, "chord completed");
        self.held.remove(token);
        self.latched.insert(token.to_string());
        true
    }

    /// Record a release, whether or not the key is part of the chord
    pub fn release(&mut self, token: &str) {
        self.held.remove(token);
        self.latched.remove(token);
    }

    /// Forget everything that is held
    pub fn clear(&mut self) {
        self.held.clear();
        self.latched.clear();
    }

    #[cfg(test)]
    pub fn is_held(&self, token: &str) -> bool {
        self.held.contains(token)
    }

    fn is_satisfied(&self) -> bool {
        self.chord.tokens().iter().all(|t| self.held.contains(t))
    }
}
