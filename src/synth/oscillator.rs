use std::{f32::consts::TAU, fmt, str::FromStr};

/*
Oscillator
==========

A phase accumulator driving one of four classic waveforms. Phase runs from
0.0 to 1.0 and wraps once per cycle:

    phase += frequency / sample_rate

  Sine      pure fundamental, soft and round
  Triangle  odd harmonics falling off as 1/n^2, mellow
  Saw       all harmonics falling off as 1/n, bright
  Square    odd harmonics falling off as 1/n, hollow

The waveforms are computed naively (no band limiting). At the pitches the
virtual piano reaches the aliasing is acceptable for a practice tool.
*/

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((f32::from(note) - 69.0) / 12.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    Sine,
    #[default]
    Triangle,
    Saw,
    Square,
}

impl FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sine" => Ok(Waveform::Sine),
            "triangle" => Ok(Waveform::Triangle),
            "saw" | "sawtooth" => Ok(Waveform::Saw),
            "square" => Ok(Waveform::Square),
            other => Err(format!("unknown waveform {other:?}")),
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Waveform::Sine => "sine",
            Waveform::Triangle => "triangle",
            Waveform::Saw => "saw",
            Waveform::Square => "square",
        })
    }
}

pub struct Oscillator {
    waveform: Waveform,
    sample_rate: f32,
    phase: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: f32) -> Self {
        Self {
            waveform,
            sample_rate,
            phase: 0.0,
        }
    }

    /// Produce one sample at `frequency` and advance the phase.
    #[inline]
    pub fn next_sample(&mut self, frequency: f32) -> f32 {
        let p = self.phase;
        let sample = match self.waveform {
            Waveform::Sine => (TAU * p).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
            Waveform::Saw => 2.0 * p - 1.0,
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        };

        self.phase = (self.phase + frequency / self.sample_rate).fract();
        sample
    }

    pub fn render(&mut self, out: &mut [f32], frequency: f32) {
        for sample in out.iter_mut() {
            *sample = self.next_sample(frequency);
        }
    }
}
