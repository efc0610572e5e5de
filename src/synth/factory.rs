use crate::{error::SynthError, synth::message::NoteEvent};

/// Boundary to a synthesis engine.
///
/// Given one note event and two equally sized output buffers, the engine
/// fills them with the rendered left and right channels. Rendering is
/// CPU-bound and must not block.
pub trait SynthEngine: Send {
    fn render(
        &mut self,
        event: &NoteEvent,
        left: &mut [f32],
        right: &mut [f32],
    ) -> Result<(), SynthError>;
}

/// Creates engines with a fixed sound design.
///
/// Engines are not assumed reentrant, so every rendered note gets a fresh
/// one from the factory and notes from different peers never share state.
pub trait EngineFactory: Send + Sync {
    type Engine: SynthEngine;

    fn create(&self) -> Self::Engine;
}

impl<F, E> EngineFactory for F
where
    F: Fn() -> E + Send + Sync,
    E: SynthEngine,
{
    type Engine = E;

    fn create(&self) -> Self::Engine {
        self()
    }
}
