//! Microphone capture using cpal
//!
//! Every stream lives on its own thread because cpal::Stream is not Send.
//! The audio callback converts device samples to interleaved stereo i16 and
//! forwards them to whichever encoder is attached to the stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig, SupportedStreamConfigRange};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use super::encoder::{CaptureMessage, CpalEncoder, OutputKind};
use super::resample::{f32_to_i16, to_stereo};
use crate::application::ports::{
    CaptureConstraints, CaptureDevice, CaptureError, CaptureStream,
};
use crate::domain::format::{AudioFormat, Container};

/// MIME types this adapter can encode
pub const SUPPORTED_MIME_TYPES: &[&str] = &["audio/flac", "audio/wav"];

/// Where the audio callback sends converted samples
pub(crate) type SampleSink = Arc<StdMutex<Option<std_mpsc::Sender<CaptureMessage>>>>;

/// Capture device backed by the default cpal input
#[derive(Debug, Default)]
pub struct CpalCaptureDevice;

impl CpalCaptureDevice {
    pub fn new() -> Self {
        Self
    }

    fn input_device() -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        host.default_input_device()
            .ok_or(CaptureError::NoAudioDevice)
    }

    fn input_config(
        device: &cpal::Device,
        constraints: &CaptureConstraints,
    ) -> Result<(StreamConfig, SampleFormat), CaptureError> {
        let ranges: Vec<SupportedStreamConfigRange> = device
            .supported_input_configs()
            .map_err(|e| CaptureError::Denied(format!("Failed to get configs: {}", e)))?
            .collect();

        select_config(&ranges, constraints)
            .ok_or_else(|| CaptureError::StreamFailed("No suitable config found".into()))
    }

    /// Open and start the input stream. Runs on the capture thread.
    fn open(
        constraints: &CaptureConstraints,
        sink: SampleSink,
    ) -> Result<(cpal::Stream, StreamInfo), CaptureError> {
        let device = Self::input_device()?;
        let (config, sample_format) = Self::input_config(&device, constraints)?;
        let channels = config.channels;
        let info = StreamInfo {
            sample_rate: config.sample_rate.0,
            channels,
        };

        let error_sink = Arc::clone(&sink);
        let on_error = move |err: cpal::StreamError| {
            error!(error = %err, "Audio stream error");
            forward(&error_sink, CaptureMessage::Failed(err.to_string()));
        };

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    forward(&sink, CaptureMessage::Samples(to_stereo(data, channels)));
                },
                on_error,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let i16_data: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                    forward(&sink, CaptureMessage::Samples(to_stereo(&i16_data, channels)));
                },
                on_error,
                None,
            ),
            other => {
                return Err(CaptureError::StreamFailed(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        }
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => CaptureError::NoAudioDevice,
            other => CaptureError::StreamFailed(other.to_string()),
        })?;

        stream
            .play()
            .map_err(|e| CaptureError::StreamFailed(e.to_string()))?;

        Ok((stream, info))
    }
}

fn forward(sink: &SampleSink, message: CaptureMessage) {
    if let Ok(guard) = sink.lock() {
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(message);
        }
    }
}

/// Pick the input config closest to the constraints.
///
/// Prefers ranges containing the requested rate, then the requested channel
/// count, then more channels up to the requested count.
pub fn select_config(
    ranges: &[SupportedStreamConfigRange],
    constraints: &CaptureConstraints,
) -> Option<(StreamConfig, SampleFormat)> {
    let wanted_rate = constraints.sample_rate;
    let wanted_channels = constraints.channel_count;
    let includes_rate = |r: &SupportedStreamConfigRange| {
        r.min_sample_rate().0 <= wanted_rate && r.max_sample_rate().0 >= wanted_rate
    };

    let best = ranges
        .iter()
        .filter(|r| matches!(r.sample_format(), SampleFormat::I16 | SampleFormat::F32))
        .max_by_key(|r| {
            (
                includes_rate(r),
                r.channels() == wanted_channels,
                r.channels().min(wanted_channels),
            )
        })?;

    let sample_rate = if includes_rate(best) {
        SampleRate(wanted_rate)
    } else if best.max_sample_rate().0 < wanted_rate {
        best.max_sample_rate()
    } else {
        best.min_sample_rate()
    };

    Some((
        StreamConfig {
            channels: best.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        },
        best.sample_format(),
    ))
}

/// Negotiated device parameters of an open stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Handle to a running capture thread
pub struct CpalStream {
    info: StreamInfo,
    sink: SampleSink,
    stop_tx: StdMutex<Option<std_mpsc::Sender<()>>>,
    active: AtomicBool,
}

impl CpalStream {
    pub fn info(&self) -> StreamInfo {
        self.info
    }

    pub(crate) fn sink(&self) -> SampleSink {
        Arc::clone(&self.sink)
    }
}

impl CaptureStream for CpalStream {
    fn stop_tracks(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut sink) = self.sink.lock() {
            sink.take();
        }
        if let Ok(mut stop_tx) = self.stop_tx.lock() {
            // Dropping the sender also wakes the capture thread
            if let Some(tx) = stop_tx.take() {
                let _ = tx.send(());
            }
        }
        debug!("Capture stream released");
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

#[async_trait]
impl CaptureDevice for CpalCaptureDevice {
    type Stream = CpalStream;
    type Encoder = CpalEncoder;

    async fn request_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<CpalStream, CaptureError> {
        let constraints = *constraints;
        let sink: SampleSink = Arc::new(StdMutex::new(None));
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let thread_sink = Arc::clone(&sink);
        std::thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                let stream = match CpalCaptureDevice::open(&constraints, thread_sink) {
                    Ok((stream, info)) => {
                        let _ = ready_tx.send(Ok(info));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Hold the stream until stopped
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|e| CaptureError::StreamFailed(e.to_string()))?;

        let info = ready_rx
            .await
            .map_err(|_| CaptureError::StreamFailed("capture thread exited".into()))??;

        info!(
            sample_rate = info.sample_rate,
            channels = info.channels,
            latency = ?constraints.latency,
            "Capture stream opened"
        );

        Ok(CpalStream {
            info,
            sink,
            stop_tx: StdMutex::new(Some(stop_tx)),
            active: AtomicBool::new(true),
        })
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        SUPPORTED_MIME_TYPES.contains(&mime_type)
    }

    fn create_encoder(
        &self,
        stream: &CpalStream,
        format: &AudioFormat,
        bitrate: u32,
    ) -> Result<CpalEncoder, CaptureError> {
        if !stream.is_active() {
            return Err(CaptureError::StreamFailed("stream already stopped".into()));
        }

        let kind = match format.container {
            Container::Flac => OutputKind::Flac,
            Container::Wav => OutputKind::Wav,
            Container::Ogg => {
                return Err(CaptureError::UnsupportedFormat(format.mime_type.to_string()))
            }
        };
        // Both outputs are lossless; the bitrate only matters for lossy codecs
        debug!(format = format.display_name, bitrate, "Encoder created");

        Ok(CpalEncoder::new(kind, stream.info(), stream.sink()))
    }
}
