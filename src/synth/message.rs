use crate::{
    error::SynthError,
    protocol::{MidiPayload, NoteState},
};

/// A validated note event, ready for a synthesis engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NoteEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

impl NoteEvent {
    pub fn note(&self) -> u8 {
        match *self {
            NoteEvent::NoteOn { note, .. } | NoteEvent::NoteOff { note } => note,
        }
    }
}

impl TryFrom<&MidiPayload> for NoteEvent {
    type Error = SynthError;

    /// Rejects note numbers and velocities outside 0..=127.
    fn try_from(midi: &MidiPayload) -> Result<Self, Self::Error> {
        let note = u8::try_from(midi.number)
            .ok()
            .filter(|n| *n <= 127)
            .ok_or(SynthError::NoteOutOfRange(midi.number))?;
        let velocity = u8::try_from(midi.velocity)
            .ok()
            .filter(|v| *v <= 127)
            .ok_or(SynthError::VelocityOutOfRange(midi.velocity))?;

        Ok(match midi.state {
            NoteState::On => NoteEvent::NoteOn { note, velocity },
            NoteState::Off => NoteEvent::NoteOff { note },
        })
    }
}
