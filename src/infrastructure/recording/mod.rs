//! Recording infrastructure module
//!
//! Captures from the default microphone with cpal and encodes takes as
//! 48kHz stereo FLAC or WAV.

mod cpal_device;
mod encoder;
mod flac_encoder;
mod resample;
mod wav;

pub use cpal_device::{select_config, CpalCaptureDevice, CpalStream, StreamInfo, SUPPORTED_MIME_TYPES};
pub use encoder::{CpalEncoder, OutputKind};
pub use flac_encoder::{EncodingError, FlacStreamEncoder, TARGET_CHANNELS, TARGET_SAMPLE_RATE};
pub use resample::StereoResampler;
