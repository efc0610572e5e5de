//! Built-in tone engine: one oscillator shaped by a linear ADSR.
//!
//! Stands in for a sample-based synthesizer. Every note is rendered into a
//! fixed-length buffer; the gate is held until the release tail exactly fits
//! the remaining space, so a clip always ends in silence.

use crate::{
    error::SynthError,
    synth::{
        envelope::{Adsr, Envelope},
        factory::SynthEngine,
        message::NoteEvent,
        oscillator::{midi_note_to_freq, Oscillator, Waveform},
    },
};

/// Per-note gain, leaving room for a handful of simultaneous notes.
const HEADROOM: f32 = 0.25;
/// How far the extreme notes sit from center (0 = mono, 1 = hard pan).
const PAN_WIDTH: f32 = 0.3;

/// Piano-like shape: instant attack, long decay, no sustain.
pub const PIANO: Adsr = Adsr {
    attack: 0.005,
    decay: 1.2,
    sustain: 0.0,
    release: 0.15,
};

pub struct ToneEngine {
    sample_rate: f32,
    waveform: Waveform,
    shape: Adsr,
}

impl ToneEngine {
    pub fn new(sample_rate: f32, waveform: Waveform) -> Self {
        Self {
            sample_rate,
            waveform,
            shape: PIANO,
        }
    }

    pub fn with_shape(mut self, shape: Adsr) -> Self {
        self.shape = shape;
        self
    }
}

/// Left/right gains for a note, lower notes to the left.
fn pan(note: u8) -> (f32, f32) {
    let position = ((f32::from(note) - 64.0) / 64.0).clamp(-1.0, 1.0) * PAN_WIDTH;
    (1.0 - position.max(0.0), 1.0 + position.min(0.0))
}

impl SynthEngine for ToneEngine {
    fn render(
        &mut self,
        event: &NoteEvent,
        left: &mut [f32],
        right: &mut [f32],
    ) -> Result<(), SynthError> {
        if left.len() != right.len() {
            return Err(SynthError::Engine(format!(
                "channel buffers differ in length ({} vs {})",
                left.len(),
                right.len()
            )));
        }

        left.fill(0.0);
        right.fill(0.0);

        // A fresh engine has nothing sounding, so a note-off renders silence.
        let NoteEvent::NoteOn { note, velocity } = *event else {
            return Ok(());
        };

        let frequency = midi_note_to_freq(note);
        let gain = HEADROOM * f32::from(velocity) / 127.0;
        let (left_gain, right_gain) = pan(note);

        let mut osc = Oscillator::new(self.waveform, self.sample_rate);
        let mut env = Envelope::new(self.shape, self.sample_rate);
        let gate_len = left.len().saturating_sub(env.release_samples());

        env.gate_on();
        for (i, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            if i == gate_len {
                env.gate_off();
            }
            let sample = osc.next_sample(frequency) * env.next_level() * gain;
            *l = sample * left_gain;
            *r = sample * right_gain;
        }

        Ok(())
    }
}
