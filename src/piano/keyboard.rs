use std::collections::HashMap;

use super::octave::{build_octave, in_range, to_binding_map, Note, Octave};
use crate::protocol::MidiPayload;

/// Turns key presses into note events.
pub struct Keyboard {
    notes: Vec<Note>,
    bindings: HashMap<String, Note>,
    velocity: u8,
}

impl Keyboard {
    pub fn new(octave: Octave, velocity: u8) -> Self {
        let notes = build_octave(octave);
        let bindings = to_binding_map(&notes);
        Self {
            notes,
            bindings,
            velocity: velocity.min(127),
        }
    }

    /// NOTE_ON for `key`, or `None` if the key is unbound or out of range.
    pub fn press(&self, key: &str) -> Option<MidiPayload> {
        let note = self.bindings.get(key)?;
        in_range(note.midi).then(|| MidiPayload::note_on(note.midi, i32::from(self.velocity)))
    }

    /// Notes in keyboard order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::NoteState;

    #[test]
    fn bound_key_plays_note_on() {
        let keyboard = Keyboard::new(Octave::C4, 127);
        let midi = keyboard.press("h").unwrap();
        assert_eq!(midi.state, NoteState::On);
        assert_eq!(midi.number, 69);
        assert_eq!(midi.velocity, 127);
    }

    #[test]
    fn unbound_key_is_ignored() {
        let keyboard = Keyboard::new(Octave::C4, 127);
        assert_eq!(keyboard.press("z"), None);
        assert_eq!(keyboard.press("tab"), None);
    }

    #[test]
    fn out_of_range_keys_are_ignored() {
        // C0 octave: 12..=29, only 21 and up are playable.
        let keyboard = Keyboard::new(Octave::C0, 100);
        assert_eq!(keyboard.press("a"), None);
        assert_eq!(keyboard.press("h").map(|m| m.number), Some(21));
    }

    #[test]
    fn velocity_is_clamped() {
        let keyboard = Keyboard::new(Octave::C4, 200);
        assert_eq!(keyboard.press("a").unwrap().velocity, 127);
    }
}
