use std::{sync::Arc, time::Duration};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, SampleFormat, Stream, StreamConfig, SupportedBufferSize,
};
use log::{error, info};
use rtrb::Producer;

use super::mix::Mix;
use crate::{error::AudioError, MAX_BLOCK_SIZE};

/// The platform output stream draining a [`Mix`].
///
/// The underlying stream is not `Send`; keep this value on the thread that
/// opened it. Dropping it stops playback.
pub struct AudioOutput {
    _stream: Stream,
    sample_rate: u32,
    channels: usize,
}

impl AudioOutput {
    /// Open the default output device and start pulling from `mix`.
    ///
    /// `buffer` is a latency target; it is clamped to what the device
    /// supports. When `meter` is given, a mono copy of every output frame is
    /// pushed into it (frames are dropped while it is full).
    pub fn start(
        mix: Arc<Mix>,
        meter: Option<Producer<f32>>,
        buffer: Duration,
    ) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::Device(e.to_string()))?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat);
        }

        let sample_rate = supported.sample_rate().0;
        let channels = usize::from(supported.channels());
        let wanted = (f64::from(sample_rate) * buffer.as_secs_f64()).round() as u32;
        let buffer_size = match supported.buffer_size() {
            SupportedBufferSize::Range { min, max } if wanted > 0 => {
                BufferSize::Fixed(wanted.clamp(*min, *max))
            }
            _ => BufferSize::Default,
        };
        let mut config: StreamConfig = supported.into();
        config.buffer_size = buffer_size;

        info!(
            "audio output: {} Hz, {} channels, buffer {:?}",
            sample_rate, channels, config.buffer_size
        );

        let mut meter = meter;
        let mut left = vec![0.0f32; MAX_BLOCK_SIZE];
        let mut right = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _| {
                    let total_frames = data.len() / channels;
                    let mut frames_written = 0;

                    while frames_written < total_frames {
                        let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                        let (l, r) = (&mut left[..frames], &mut right[..frames]);
                        mix.next(l, r);

                        let out = &mut data[frames_written * channels..(frames_written + frames) * channels];
                        for (i, frame) in out.chunks_exact_mut(channels).enumerate() {
                            write_frame(frame, l[i], r[i]);
                            if let Some(meter) = meter.as_mut() {
                                let _ = meter.push(0.5 * (l[i] + r[i]));
                            }
                        }

                        frames_written += frames;
                    }
                },
                |err| error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::Device(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::Device(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
        })
    }

    /// Device sample rate; render notes at this rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

/// Spread one stereo frame over a device frame: channel 0 left, channel 1
/// right, any extra channels silent. Mono devices get the average.
fn write_frame(frame: &mut [f32], left: f32, right: f32) {
    match frame {
        [mono] => *mono = 0.5 * (left + right),
        [l, r, rest @ ..] => {
            *l = left;
            *r = right;
            rest.fill(0.0);
        }
        [] => {}
    }
}
