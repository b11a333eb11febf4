//! Capture device port interfaces

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::format::AudioFormat;

/// Capture device errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("{0}")]
    Denied(String),

    #[error("No audio device available")]
    NoAudioDevice,

    #[error("Failed to open capture stream: {0}")]
    StreamFailed(String),

    #[error("Unsupported encoding: {0}")]
    UnsupportedFormat(String),

    #[error("Encoder failed: {0}")]
    EncoderFailed(String),

    /// The device failed while a stream was running
    #[error("Audio device error: {0}")]
    DeviceFailed(String),
}

/// Constraints for a capture stream request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub channel_count: u16,
    pub sample_rate: u32,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    pub latency: Option<Duration>,
}

impl CaptureConstraints {
    /// Raw stereo 48 kHz with all voice processing disabled.
    /// Used to check for permission.
    pub const fn raw() -> Self {
        Self {
            channel_count: 2,
            sample_rate: 48_000,
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
            latency: None,
        }
    }

    /// Raw constraints plus a 10ms latency hint, used for actual recording
    pub const fn high_fidelity() -> Self {
        Self {
            latency: Some(Duration::from_millis(10)),
            ..Self::raw()
        }
    }
}

/// Events emitted by a running encoder, in delivery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// Encoding has begun
    Started,
    /// An encoded chunk
    Data(Vec<u8>),
    /// The encoder finished; no more data follows
    Stopped,
    /// The device or encoder failed
    Error(String),
}

/// Sender half handed to an encoder
pub type EncoderEventSender = mpsc::UnboundedSender<EncoderEvent>;

/// A live capture stream
pub trait CaptureStream: Send + Sync {
    /// Release the device. Safe to call more than once.
    fn stop_tracks(&self);

    /// Whether the stream still holds the device
    fn is_active(&self) -> bool;
}

/// An encoder attached to a capture stream
pub trait AudioEncoder: Send + Sync {
    /// Begin encoding, delivering a chunk roughly every `timeslice`.
    fn start(&mut self, timeslice: Duration, events: EncoderEventSender) -> Result<(), CaptureError>;

    /// Ask the encoder to finalize. Remaining data is delivered, then
    /// [`EncoderEvent::Stopped`].
    fn stop(&mut self);

    /// Whether the encoder has finished or never started
    fn is_inactive(&self) -> bool;
}

/// Port for the microphone and its encoders
#[async_trait]
pub trait CaptureDevice: Send + Sync + 'static {
    type Stream: CaptureStream + 'static;
    type Encoder: AudioEncoder + 'static;

    /// Request an audio stream with the given constraints.
    ///
    /// # Returns
    /// The stream, or an error describing why access was refused
    async fn request_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Self::Stream, CaptureError>;

    /// Check whether an encoding is supported
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Create an encoder for a stream
    fn create_encoder(
        &self,
        stream: &Self::Stream,
        format: &AudioFormat,
        bitrate: u32,
    ) -> Result<Self::Encoder, CaptureError>;
}
