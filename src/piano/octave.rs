use std::collections::HashMap;

/*
Virtual Piano Octave
====================

The computer keyboard plays 18 consecutive semitones starting at C of the
selected octave: naturals on the home row, accidentals on the row above,
roughly where the black keys sit on a real piano.

    w e   t y u   o p
   a s d f g h j k l ; '
   C D E F G A B C D E F

MIDI numbering: C0 = 12, one octave = 12 semitones, so

    midi = 12 + 12 * octave + index

C4 (middle C) = 60. Octaves below C0 yield numbers under 12; those keys are
filtered out by `in_range` before anything is sent.
*/

/// Octave selector, named after its C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Octave(pub i32);

impl Octave {
    pub const CNEG2: Octave = Octave(-2);
    pub const CNEG1: Octave = Octave(-1);
    pub const C0: Octave = Octave(0);
    pub const C1: Octave = Octave(1);
    pub const C2: Octave = Octave(2);
    pub const C3: Octave = Octave(3);
    pub const C4: Octave = Octave(4);
    pub const C5: Octave = Octave(5);
    pub const C6: Octave = Octave(6);
    pub const C7: Octave = Octave(7);
}

impl Default for Octave {
    fn default() -> Self {
        Octave::C4
    }
}

/// One playable key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// MIDI note number, C4 = 60.
    pub midi: i32,
    /// Note name, e.g. "C" or "F#/Gb".
    pub name: &'static str,
    /// Sharp/flat ("black") key.
    pub is_accidental: bool,
    /// Keyboard key that plays this note.
    pub key_binding: &'static str,
}

/// MIDI number of C0.
const MIDI_C0: i32 = 12;
const OCTAVE_LEN: usize = 12;
/// Offset of C in `NOTE_NAMES`.
const C_OFFSET: usize = 3;

/// Chromatic names starting at A.
const NOTE_NAMES: [(&str, bool); OCTAVE_LEN] = [
    ("A", false),
    ("A#/Bb", true),
    ("B", false),
    ("C", false),
    ("C#/Db", true),
    ("D", false),
    ("D#/Eb", true),
    ("E", false),
    ("F", false),
    ("F#/Gb", true),
    ("G", false),
    ("G#/Ab", true),
];

/// Keyboard keys in playing order.
pub const KEY_BINDINGS: [&str; 18] = [
    "a", "w", "s", "e", "d", "f", "t", "g", "y", "h", "u", "j", "k", "o", "l", "p", ";", "'",
];

/// Build the 18 notes playable from the keyboard, starting at C of `octave`.
pub fn build_octave(octave: Octave) -> Vec<Note> {
    KEY_BINDINGS
        .iter()
        .enumerate()
        .map(|(i, &key_binding)| {
            let (name, is_accidental) = NOTE_NAMES[(i + C_OFFSET) % OCTAVE_LEN];
            Note {
                midi: MIDI_C0 + OCTAVE_LEN as i32 * octave.0 + i as i32,
                name,
                is_accidental,
                key_binding,
            }
        })
        .collect()
}

/// Index notes by key binding.
pub fn to_binding_map(notes: &[Note]) -> HashMap<String, Note> {
    notes
        .iter()
        .map(|note| (note.key_binding.to_string(), note.clone()))
        .collect()
}

/// Whether a note number is playable: strictly between 20 and 128.
pub fn in_range(midi: i32) -> bool {
    midi > 20 && midi < 128
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(midi: i32, key_binding: &'static str, name: &'static str, is_accidental: bool) -> Note {
        Note {
            midi,
            name,
            is_accidental,
            key_binding,
        }
    }

    #[test]
    fn c4_octave_layout() {
        let want = vec![
            note(60, "a", "C", false),
            note(61, "w", "C#/Db", true),
            note(62, "s", "D", false),
            note(63, "e", "D#/Eb", true),
            note(64, "d", "E", false),
            note(65, "f", "F", false),
            note(66, "t", "F#/Gb", true),
            note(67, "g", "G", false),
            note(68, "y", "G#/Ab", true),
            note(69, "h", "A", false),
            note(70, "u", "A#/Bb", true),
            note(71, "j", "B", false),
            note(72, "k", "C", false),
            note(73, "o", "C#/Db", true),
            note(74, "l", "D", false),
            note(75, "p", "D#/Eb", true),
            note(76, ";", "E", false),
            note(77, "'", "F", false),
        ];
        assert_eq!(build_octave(Octave::C4), want);
    }

    #[test]
    fn octaves_are_twelve_apart() {
        let c3 = build_octave(Octave::C3);
        let c4 = build_octave(Octave::C4);
        assert_eq!(c4[0].midi - c3[0].midi, 12);
        assert_eq!(build_octave(Octave::C0)[0].midi, 12);
        assert_eq!(build_octave(Octave::CNEG2)[0].midi, -12);
    }

    #[test]
    fn binding_map_covers_every_key() {
        let notes = build_octave(Octave::C4);
        let map = to_binding_map(&notes);
        assert_eq!(map.len(), 18, "bindings are unique");
        assert_eq!(map["a"].midi, 60);
        assert_eq!(map["'"].midi, 77);
    }

    #[test]
    fn range_boundaries_are_exclusive() {
        assert!(!in_range(20));
        assert!(in_range(21));
        assert!(in_range(127));
        assert!(!in_range(128));
        assert!(!in_range(0));
    }
}
