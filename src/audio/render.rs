use std::{sync::Arc, time::Duration};

use log::debug;

use super::{clip::AudioClip, mix::Mix};
use crate::{
    error::SynthError,
    protocol::MidiPayload,
    synth::{factory::SynthEngine, EngineFactory, NoteEvent},
};

/// Turns note events into fixed-length stereo clips.
///
/// Every note lasts `clip_duration` no matter when (or whether) its
/// NOTE_OFF arrives. Held-note semantics would need NOTE_OFF delivery
/// guarantees the protocol does not give.
pub struct NoteRenderer<F> {
    factory: F,
    sample_rate: u32,
    clip_duration: Duration,
}

impl<F: EngineFactory> NoteRenderer<F> {
    pub fn new(factory: F, sample_rate: u32, clip_duration: Duration) -> Self {
        Self {
            factory,
            sample_rate,
            clip_duration,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames in every rendered clip.
    pub fn clip_frames(&self) -> usize {
        (f64::from(self.sample_rate) * self.clip_duration.as_secs_f64()).round() as usize
    }

    /// Validate `midi` and render it with a fresh engine.
    pub fn render(&self, midi: &MidiPayload) -> Result<AudioClip, SynthError> {
        let event = NoteEvent::try_from(midi)?;
        let frames = self.clip_frames();
        let mut left = vec![0.0; frames];
        let mut right = vec![0.0; frames];

        let mut engine = self.factory.create();
        engine.render(&event, &mut left, &mut right)?;

        Ok(AudioClip::new(left, right))
    }
}

/// Renders notes straight into a live mix.
pub struct NotePlayer<F> {
    renderer: NoteRenderer<F>,
    mix: Arc<Mix>,
}

impl<F: EngineFactory> NotePlayer<F> {
    pub fn new(renderer: NoteRenderer<F>, mix: Arc<Mix>) -> Self {
        Self { renderer, mix }
    }

    /// Render `midi` and start it in the mix.
    ///
    /// A note that fails to render is returned as an error and never reaches
    /// the mix; the notes already playing are unaffected.
    pub fn play(&self, midi: &MidiPayload) -> Result<(), SynthError> {
        let clip = self.renderer.render(midi)?;
        debug!(
            "playing note {} ({} frames, {} active)",
            midi.number,
            clip.len(),
            self.mix.active() + 1
        );
        self.mix.add(clip);
        Ok(())
    }

    pub fn mix(&self) -> &Arc<Mix> {
        &self.mix
    }

    pub fn renderer(&self) -> &NoteRenderer<F> {
        &self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes the note number into every frame.
    struct Stamp;

    impl SynthEngine for Stamp {
        fn render(
            &mut self,
            event: &NoteEvent,
            left: &mut [f32],
            right: &mut [f32],
        ) -> Result<(), SynthError> {
            left.fill(f32::from(event.note()));
            right.fill(-f32::from(event.note()));
            Ok(())
        }
    }

    struct Broken;

    impl SynthEngine for Broken {
        fn render(&mut self, _: &NoteEvent, _: &mut [f32], _: &mut [f32]) -> Result<(), SynthError> {
            Err(SynthError::Engine("no sound bank".into()))
        }
    }

    #[test]
    fn renders_fixed_length_clip() {
        let renderer = NoteRenderer::new(|| Stamp, 1_000, Duration::from_millis(250));
        let clip = renderer.render(&MidiPayload::note_on(60, 100)).unwrap();
        assert_eq!(clip.len(), 250);

        let mut clip = clip;
        let (l, r) = clip.read(2);
        assert_eq!(l, &[60.0, 60.0]);
        assert_eq!(r, &[-60.0, -60.0]);
    }

    #[test]
    fn note_off_still_occupies_a_full_clip() {
        // Fixed-duration clips are a deliberate compromise: NOTE_OFF does not
        // shorten anything, it is rendered as its own clip.
        let renderer = NoteRenderer::new(|| Stamp, 1_000, Duration::from_secs(2));
        let clip = renderer.render(&MidiPayload::note_off(60)).unwrap();
        assert_eq!(clip.len(), 2_000);
    }

    #[test]
    fn out_of_range_notes_are_rejected() {
        let renderer = NoteRenderer::new(|| Stamp, 1_000, Duration::from_millis(10));
        assert_eq!(
            renderer.render(&MidiPayload::note_on(128, 100)),
            Err(SynthError::NoteOutOfRange(128))
        );
        assert_eq!(
            renderer.render(&MidiPayload::note_on(-1, 100)),
            Err(SynthError::NoteOutOfRange(-1))
        );
        assert_eq!(
            renderer.render(&MidiPayload::note_on(60, 200)),
            Err(SynthError::VelocityOutOfRange(200))
        );
    }

    #[test]
    fn failed_note_does_not_disturb_the_mix() {
        let mix = Arc::new(Mix::new());
        let good = NotePlayer::new(
            NoteRenderer::new(|| Stamp, 1_000, Duration::from_millis(10)),
            mix.clone(),
        );
        let bad = NotePlayer::new(
            NoteRenderer::new(|| Broken, 1_000, Duration::from_millis(10)),
            mix.clone(),
        );

        good.play(&MidiPayload::note_on(60, 100)).unwrap();
        assert!(bad.play(&MidiPayload::note_on(62, 100)).is_err());
        assert!(good.play(&MidiPayload::note_on(200, 100)).is_err());

        assert_eq!(mix.active(), 1);
        let mut left = vec![0.0; 10];
        let mut right = vec![0.0; 10];
        assert!(mix.next(&mut left, &mut right));
        assert!(left.iter().all(|s| *s == 60.0));
    }
}
