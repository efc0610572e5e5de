//! Note rendering and the live output mix.
//!
//! ```text
//! MidiPayload ──NoteRenderer──> AudioClip ──Mix::add──> Mix ──AudioOutput──> device
//! ```

mod clip;
mod mix;
#[cfg(feature = "rtrb")]
mod output;
mod render;

pub use clip::AudioClip;
pub use mix::{Mix, StereoSource};
#[cfg(feature = "rtrb")]
pub use output::AudioOutput;
pub use render::{NotePlayer, NoteRenderer};
