//! Virtual piano: the octave note table and the key-press input boundary.

mod keyboard;
mod octave;

pub use keyboard::Keyboard;
pub use octave::{build_octave, in_range, to_binding_map, Note, Octave, KEY_BINDINGS};
