use crate::error::AudioError;

/// A finite stereo buffer with a read cursor.
///
/// Both channels always have the same length. The cursor only moves forward
/// through `read`/`read_into`, or anywhere in `0..=len` through `seek`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    left: Vec<f32>,
    right: Vec<f32>,
    cursor: usize,
}

impl AudioClip {
    /// Build a clip from two channels. The longer channel is padded with
    /// silence so both match.
    pub fn new(mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
        let len = left.len().max(right.len());
        left.resize(len, 0.0);
        right.resize(len, 0.0);
        Self {
            left,
            right,
            cursor: 0,
        }
    }

    pub fn silent(frames: usize) -> Self {
        Self::new(vec![0.0; frames], vec![0.0; frames])
    }

    /// Take up to `frames` frames from the cursor and advance past them.
    ///
    /// Returns short (possibly empty) slices near the end of the clip.
    pub fn read(&mut self, frames: usize) -> (&[f32], &[f32]) {
        let start = self.cursor;
        let end = start.saturating_add(frames).min(self.left.len());
        self.cursor = end;
        (&self.left[start..end], &self.right[start..end])
    }

    /// Add up to `left.len()` frames into the given buffers. Returns the
    /// number of frames mixed.
    pub fn read_into(&mut self, left: &mut [f32], right: &mut [f32]) -> usize {
        let frames = left.len().min(right.len());
        let (l, r) = self.read(frames);
        for (out, s) in left.iter_mut().zip(l) {
            *out += s;
        }
        for (out, s) in right.iter_mut().zip(r) {
            *out += s;
        }
        l.len()
    }

    pub fn seek(&mut self, pos: usize) -> Result<(), AudioError> {
        if pos > self.len() {
            return Err(AudioError::SeekOutOfRange {
                pos,
                len: self.len(),
            });
        }
        self.cursor = pos;
        Ok(())
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.len() - self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> AudioClip {
        let left: Vec<f32> = (0..len).map(|i| i as f32).collect();
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        AudioClip::new(left, right)
    }

    #[test]
    fn read_advances_cursor_and_shortens_at_end() {
        let mut clip = ramp(10);

        let (l, r) = clip.read(4);
        assert_eq!(l, &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(r, &[0.0, -1.0, -2.0, -3.0]);
        assert_eq!(clip.position(), 4);

        let (l, _) = clip.read(100);
        assert_eq!(l.len(), 6);
        assert!(clip.is_finished());

        let (l, r) = clip.read(8);
        assert!(l.is_empty() && r.is_empty());
    }

    #[test]
    fn seek_accepts_end_and_rejects_past_end() {
        let mut clip = ramp(10);
        assert!(clip.seek(10).is_ok());
        assert!(clip.is_finished());
        assert_eq!(clip.seek(11), Err(AudioError::SeekOutOfRange { pos: 11, len: 10 }));
        assert_eq!(clip.position(), 10, "failed seek must leave the cursor alone");

        clip.seek(0).unwrap();
        assert_eq!(clip.remaining(), 10);
    }

    #[test]
    fn read_into_accumulates() {
        let mut clip = ramp(3);
        let mut left = vec![1.0; 5];
        let mut right = vec![1.0; 5];
        assert_eq!(clip.read_into(&mut left, &mut right), 3);
        assert_eq!(left, vec![1.0, 2.0, 3.0, 1.0, 1.0]);
        assert_eq!(right, vec![1.0, 0.0, -1.0, 1.0, 1.0]);
    }

    #[test]
    fn channels_are_padded_to_equal_length() {
        let clip = AudioClip::new(vec![1.0; 4], vec![1.0; 2]);
        assert_eq!(clip.len(), 4);
        let mut clip = clip;
        let (_, r) = clip.read(4);
        assert_eq!(r, &[1.0, 1.0, 0.0, 0.0]);
    }
}
