//! Conversion of device audio to 48kHz interleaved stereo

use rubato::{FftFixedIn, Resampler};

use crate::application::ports::CaptureError;

use super::flac_encoder::TARGET_SAMPLE_RATE;

/// Frames handed to the resampler per call
const CHUNK_FRAMES: usize = 1024;

/// Map interleaved device samples with `channels` channels to stereo.
/// Mono is duplicated, extra channels are dropped.
pub fn to_stereo(samples: &[i16], channels: u16) -> Vec<i16> {
    match channels {
        0 => Vec::new(),
        1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        2 => samples.to_vec(),
        n => samples
            .chunks_exact(n as usize)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

/// Convert an f32 sample to i16
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Incremental stereo resampler to 48kHz.
///
/// Samples are buffered until a full resampler chunk is available;
/// [`flush`](Self::flush) pads and drains the remainder.
pub struct StereoResampler {
    resampler: Option<FftFixedIn<f32>>,
    ratio: f64,
    pending: [Vec<f32>; 2],
}

impl StereoResampler {
    pub fn new(input_rate: u32) -> Result<Self, CaptureError> {
        let resampler = if input_rate == TARGET_SAMPLE_RATE {
            None
        } else {
            Some(
                FftFixedIn::<f32>::new(
                    input_rate as usize,
                    TARGET_SAMPLE_RATE as usize,
                    CHUNK_FRAMES,
                    2, // Sub-chunks
                    2, // Stereo
                )
                .map_err(|e| CaptureError::EncoderFailed(format!("Resampler init failed: {}", e)))?,
            )
        };

        Ok(Self {
            resampler,
            ratio: TARGET_SAMPLE_RATE as f64 / input_rate.max(1) as f64,
            pending: [Vec::new(), Vec::new()],
        })
    }

    /// Feed interleaved stereo samples, returning whatever is ready
    pub fn push(&mut self, interleaved: &[i16]) -> Result<Vec<i16>, CaptureError> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(interleaved.to_vec());
        };

        for frame in interleaved.chunks_exact(2) {
            self.pending[0].push(frame[0] as f32 / 32768.0);
            self.pending[1].push(frame[1] as f32 / 32768.0);
        }

        let mut output = Vec::new();
        loop {
            let needed = resampler.input_frames_next();
            if self.pending[0].len() < needed {
                break;
            }
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|channel| channel.drain(..needed).collect())
                .collect();
            let resampled = resampler
                .process(&chunk, None)
                .map_err(|e| CaptureError::EncoderFailed(format!("Resampling failed: {}", e)))?;
            interleave_into(&resampled, &mut output);
        }
        Ok(output)
    }

    /// Drain buffered samples, zero-padding the last chunk
    pub fn flush(&mut self) -> Result<Vec<i16>, CaptureError> {
        let ratio = self.ratio;
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(Vec::new());
        };
        let remaining = self.pending[0].len();
        if remaining == 0 {
            return Ok(Vec::new());
        }

        let needed = resampler.input_frames_next();
        let chunk: Vec<Vec<f32>> = self
            .pending
            .iter_mut()
            .map(|channel| {
                let mut padded: Vec<f32> = channel.drain(..).collect();
                padded.resize(needed, 0.0);
                padded
            })
            .collect();
        let resampled = resampler
            .process(&chunk, None)
            .map_err(|e| CaptureError::EncoderFailed(format!("Resampling failed: {}", e)))?;

        let mut output = Vec::new();
        interleave_into(&resampled, &mut output);
        let expected_frames = (remaining as f64 * ratio).ceil() as usize;
        output.truncate(expected_frames * 2);
        Ok(output)
    }
}

fn interleave_into(channels: &[Vec<f32>], output: &mut Vec<i16>) {
    let (Some(left), Some(right)) = (channels.first(), channels.get(1)) else {
        return;
    };
    output.reserve(left.len() * 2);
    for (l, r) in left.iter().zip(right) {
        output.push(f32_to_i16(*l));
        output.push(f32_to_i16(*r));
    }
}
