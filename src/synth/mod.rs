// Purpose: note synthesis behind an engine boundary.
// The audio pipeline only sees SynthEngine/EngineFactory; ToneEngine is the
// built-in implementation.

pub mod envelope;
pub mod factory;
pub mod message;
pub mod oscillator;
pub mod tone;

pub use factory::{EngineFactory, SynthEngine};
pub use message::NoteEvent;
pub use oscillator::Waveform;
pub use tone::ToneEngine;
