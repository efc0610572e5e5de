/*
Mix
===

The mix is the single stereo source the output device pulls from. Rendered
note clips are added from any thread; the audio callback drains them block
by block:

    add(clip) ──┐
    add(clip) ──┼──> [ clip, clip, clip ] ──next()──> left/right block
    add(clip) ──┘          │
                           └── finished clips are evicted after each block

Output is the plain sum of the active clips. There is no normalization, so
many loud notes at once can exceed [-1, 1] and clip at the device. The tone
engine leaves headroom per note to make that rare.

A short mutex guards the clip list. Both sides hold it only for the length
of a push or one block of summing.
*/

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex, MutexGuard,
};

use super::clip::AudioClip;

/// A pull-based stereo source, drained by the output device on its own cadence.
pub trait StereoSource {
    /// Fill `left` and `right` with the next block. Returns `false` when the
    /// source had nothing to contribute (the block is silent).
    fn next(&mut self, left: &mut [f32], right: &mut [f32]) -> bool;
}

impl StereoSource for AudioClip {
    fn next(&mut self, left: &mut [f32], right: &mut [f32]) -> bool {
        left.fill(0.0);
        right.fill(0.0);
        self.read_into(left, right) > 0
    }
}

#[derive(Debug, Default)]
pub struct Mix {
    clips: Mutex<Vec<AudioClip>>,
    added: AtomicUsize,
}

impl Mix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start playing `clip` from its current position with the next block.
    pub fn add(&self, clip: AudioClip) {
        if clip.is_finished() {
            return;
        }
        self.lock().push(clip);
        self.added.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of clips still playing.
    pub fn active(&self) -> usize {
        self.lock().len()
    }

    /// Total clips ever added.
    pub fn added(&self) -> usize {
        self.added.load(Ordering::Relaxed)
    }

    /// Sum the next block of every active clip into `left`/`right`, then
    /// evict the clips that ran out. Returns `false` for a silent block.
    pub fn next(&self, left: &mut [f32], right: &mut [f32]) -> bool {
        left.fill(0.0);
        right.fill(0.0);

        let mut clips = self.lock();
        if clips.is_empty() {
            return false;
        }
        for clip in clips.iter_mut() {
            clip.read_into(left, right);
        }
        clips.retain(|clip| !clip.is_finished());
        true
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AudioClip>> {
        // A poisoned list still holds valid clips.
        self.clips.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StereoSource for &Mix {
    fn next(&mut self, left: &mut [f32], right: &mut [f32]) -> bool {
        Mix::next(*self, left, right)
    }
}
