/*
Linear ADSR Envelope
====================

    Level
      1.0 ┐   ╱╲
          │  ╱  ╲
      S   │ ╱    ╲_________
          │╱               ╲
      0.0 └─────────────────╲──→ Time
           A   D     S       R

Gate on starts Attack from zero. Attack ramps to 1.0, Decay ramps down to
the sustain level, Sustain holds while the gate stays on. Gate off starts
Release from whatever the current level is, so releasing during attack does
not click.

Per-sample step for a ramp:

    step = change / (seconds * sample_rate)

Release is counted in samples from a snapshot of the level taken at gate
off, which lands exactly on 0.0 when it ends.
*/

/// Shape of an envelope, in seconds and a 0-1 sustain level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for Adsr {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

pub struct Envelope {
    shape: Adsr,
    sample_rate: f32,
    stage: Stage,
    level: f32,
    release_from: f32,
    release_len: u32,
    release_pos: u32,
}

/// Shortest ramp: one sample at 48 kHz.
const MIN_TIME: f32 = 1.0 / 48_000.0;

impl Envelope {
    pub fn new(shape: Adsr, sample_rate: f32) -> Self {
        Self {
            shape: Adsr {
                attack: shape.attack.max(MIN_TIME),
                decay: shape.decay.max(MIN_TIME),
                sustain: shape.sustain.clamp(0.0, 1.0),
                release: shape.release.max(MIN_TIME),
            },
            sample_rate,
            stage: Stage::Idle,
            level: 0.0,
            release_from: 0.0,
            release_len: 1,
            release_pos: 0,
        }
    }

    /// Number of samples the release stage lasts.
    pub fn release_samples(&self) -> usize {
        (self.shape.release * self.sample_rate).round().max(1.0) as usize
    }

    pub fn gate_on(&mut self) {
        self.level = 0.0;
        self.stage = Stage::Attack;
    }

    pub fn gate_off(&mut self) {
        if self.stage == Stage::Idle {
            return;
        }
        self.release_from = self.level;
        self.release_len = self.release_samples() as u32;
        self.release_pos = 0;
        self.stage = Stage::Release;
    }

    /// Advance one sample and return the new level.
    pub fn next_level(&mut self) -> f32 {
        match self.stage {
            Stage::Idle => self.level = 0.0,
            Stage::Attack => {
                self.level += 1.0 / (self.shape.attack * self.sample_rate);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                let sustain = self.shape.sustain;
                self.level -= (1.0 - sustain) / (self.shape.decay * self.sample_rate);
                if self.level <= sustain {
                    self.level = sustain;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Sustain => self.level = self.shape.sustain,
            Stage::Release => {
                self.release_pos += 1;
                let progress = self.release_pos as f32 / self.release_len as f32;
                self.level = (self.release_from * (1.0 - progress)).max(0.0);
                if self.release_pos >= self.release_len {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
        self.level
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.stage != Stage::Idle
    }
}
