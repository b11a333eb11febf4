//! Encoder thread attached to a cpal capture stream

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use super::cpal_device::{SampleSink, StreamInfo};
use super::flac_encoder::FlacStreamEncoder;
use super::resample::StereoResampler;
use super::wav::WavSlicer;
use crate::application::ports::{AudioEncoder, CaptureError, EncoderEvent, EncoderEventSender};

/// Messages from the audio callback (and the encoder handle) to the thread
#[derive(Debug)]
pub enum CaptureMessage {
    /// Interleaved stereo samples at the device rate
    Samples(Vec<i16>),
    /// The device reported an error
    Failed(String),
    /// Stop was requested; drain and finish
    Finish,
}

/// Container written by the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Stream header, then one frame per completed block
    Flac,
    /// Header plus PCM
    Wav,
}

/// Turns captured samples into encoded chunks, one per time-slice
enum TakeEncoder {
    Flac {
        encoder: FlacStreamEncoder,
        ready: Vec<u8>,
    },
    Wav(WavSlicer),
}

impl TakeEncoder {
    fn new(kind: OutputKind) -> Result<Self, CaptureError> {
        Ok(match kind {
            OutputKind::Flac => Self::Flac {
                encoder: FlacStreamEncoder::new()
                    .map_err(|e| CaptureError::EncoderFailed(e.to_string()))?,
                ready: Vec::new(),
            },
            OutputKind::Wav => Self::Wav(WavSlicer::new()),
        })
    }

    fn push(&mut self, samples: &[i16]) -> Result<(), CaptureError> {
        match self {
            Self::Flac { encoder, ready } => {
                let bytes = encoder
                    .push(samples)
                    .map_err(|e| CaptureError::EncoderFailed(e.to_string()))?;
                ready.extend(bytes);
            }
            Self::Wav(slicer) => slicer.push(samples),
        }
        Ok(())
    }

    /// Chunk for the time-slice that just ended
    fn slice(&mut self) -> Option<Vec<u8>> {
        match self {
            Self::Flac { ready, .. } if ready.is_empty() => None,
            Self::Flac { ready, .. } => Some(std::mem::take(ready)),
            Self::Wav(slicer) => slicer.take_chunk(),
        }
    }

    /// Remaining output. No samples at all means no output.
    fn finish(self) -> Result<Option<Vec<u8>>, CaptureError> {
        match self {
            Self::Flac { encoder, mut ready } => {
                let tail = encoder
                    .finish()
                    .map_err(|e| CaptureError::EncoderFailed(e.to_string()))?;
                ready.extend(tail);
                Ok(Some(ready).filter(|bytes| !bytes.is_empty()))
            }
            Self::Wav(mut slicer) => Ok(slicer.take_chunk()),
        }
    }
}

/// Encoder handle. The work happens on a dedicated thread.
pub struct CpalEncoder {
    kind: OutputKind,
    info: StreamInfo,
    sink: SampleSink,
    control: Option<std_mpsc::Sender<CaptureMessage>>,
    active: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CpalEncoder {
    pub(crate) fn new(kind: OutputKind, info: StreamInfo, sink: SampleSink) -> Self {
        Self {
            kind,
            info,
            sink,
            control: None,
            active: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl AudioEncoder for CpalEncoder {
    fn start(&mut self, timeslice: Duration, events: EncoderEventSender) -> Result<(), CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::EncoderFailed("encoder already started".into()));
        }

        let (tx, rx) = std_mpsc::channel();
        {
            let mut sink = self
                .sink
                .lock()
                .map_err(|_| CaptureError::EncoderFailed("capture sink poisoned".into()))?;
            *sink = Some(tx.clone());
        }

        let kind = self.kind;
        let input_rate = self.info.sample_rate;
        let active = Arc::clone(&self.active);
        active.store(true, Ordering::SeqCst);

        let worker = std::thread::Builder::new()
            .name("audio-encoder".into())
            .spawn(move || {
                let _ = events.send(EncoderEvent::Started);
                let final_event = match encode_loop(kind, input_rate, timeslice, &rx, &events) {
                    Ok(()) => EncoderEvent::Stopped,
                    Err(e) => {
                        error!(error = %e, "Encoder failed");
                        EncoderEvent::Error(e.to_string())
                    }
                };
                active.store(false, Ordering::SeqCst);
                let _ = events.send(final_event);
            })
            .map_err(|e| {
                self.active.store(false, Ordering::SeqCst);
                CaptureError::EncoderFailed(e.to_string())
            })?;

        self.control = Some(tx);
        self.worker = Some(worker);
        debug!(kind = ?self.kind, ?timeslice, "Encoder started");
        Ok(())
    }

    fn stop(&mut self) {
        // Detach from the stream first so Finish is the last message
        if let Ok(mut sink) = self.sink.lock() {
            sink.take();
        }
        if let Some(control) = self.control.take() {
            if control.send(CaptureMessage::Finish).is_err() {
                warn!("Encoder thread already gone");
            }
        }
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_inactive(&self) -> bool {
        !self.active.load(Ordering::SeqCst)
    }
}

impl Drop for CpalEncoder {
    fn drop(&mut self) {
        self.stop();
        // The thread finishes on its own; never block the caller on it
        self.worker.take();
    }
}

fn encode_loop(
    kind: OutputKind,
    input_rate: u32,
    timeslice: Duration,
    rx: &std_mpsc::Receiver<CaptureMessage>,
    events: &EncoderEventSender,
) -> Result<(), CaptureError> {
    let mut resampler = StereoResampler::new(input_rate)?;
    let mut encoder = TakeEncoder::new(kind)?;
    let mut slice_started = Instant::now();

    loop {
        match rx.recv_timeout(timeslice) {
            Ok(CaptureMessage::Samples(samples)) => encoder.push(&resampler.push(&samples)?)?,
            Ok(CaptureMessage::Failed(message)) => return Err(CaptureError::DeviceFailed(message)),
            Ok(CaptureMessage::Finish) | Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
            Err(std_mpsc::RecvTimeoutError::Timeout) => {}
        }

        if slice_started.elapsed() >= timeslice {
            slice_started = Instant::now();
            if let Some(chunk) = encoder.slice() {
                let _ = events.send(EncoderEvent::Data(chunk));
            }
        }
    }

    encoder.push(&resampler.flush()?)?;
    if let Some(chunk) = encoder.finish()? {
        let _ = events.send(EncoderEvent::Data(chunk));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::mpsc;

    fn encoder(kind: OutputKind) -> (CpalEncoder, SampleSink) {
        let sink: SampleSink = Arc::new(StdMutex::new(None));
        let info = StreamInfo {
            sample_rate: 48_000,
            channels: 2,
        };
        (CpalEncoder::new(kind, info, Arc::clone(&sink)), sink)
    }

    fn feed(sink: &SampleSink, samples: Vec<i16>) {
        let guard = sink.lock().unwrap();
        guard
            .as_ref()
            .unwrap()
            .send(CaptureMessage::Samples(samples))
            .unwrap();
    }

    async fn collect(rx: &mut mpsc::UnboundedReceiver<EncoderEvent>) -> Vec<EncoderEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = matches!(event, EncoderEvent::Stopped | EncoderEvent::Error(_));
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[tokio::test]
    async fn wav_take_starts_with_header() {
        let (mut enc, sink) = encoder(OutputKind::Wav);
        let (tx, mut rx) = mpsc::unbounded_channel();

        enc.start(Duration::from_millis(5), tx).unwrap();
        assert!(!enc.is_inactive());
        feed(&sink, vec![1, 2, 3, 4]);
        enc.stop();

        let events = collect(&mut rx).await;
        assert_eq!(events.first(), Some(&EncoderEvent::Started));
        assert_eq!(events.last(), Some(&EncoderEvent::Stopped));

        let bytes: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                EncoderEvent::Data(d) => Some(d.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(bytes.len(), super::super::wav::HEADER_LEN + 8);
        assert!(enc.is_inactive());
    }

    #[tokio::test]
    async fn flac_take_arrives_in_slices() {
        let (mut enc, sink) = encoder(OutputKind::Flac);
        let (tx, mut rx) = mpsc::unbounded_channel();

        enc.start(Duration::from_millis(5), tx).unwrap();
        // Three full 4096-sample blocks, spaced over several time-slices
        for _ in 0..3 {
            feed(&sink, vec![0; 4096 * 2]);
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        enc.stop();

        let events = collect(&mut rx).await;
        let chunks: Vec<&Vec<u8>> = events
            .iter()
            .filter_map(|e| match e {
                EncoderEvent::Data(d) => Some(d),
                _ => None,
            })
            .collect();
        assert!(chunks.len() >= 2);
        assert_eq!(&chunks[0][0..4], b"fLaC");
        assert!(chunks[1..].iter().all(|c| &c[0..2] == [0xFF, 0xF8]));
    }

    #[tokio::test]
    async fn empty_take_has_no_data() {
        let (mut enc, _sink) = encoder(OutputKind::Flac);
        let (tx, mut rx) = mpsc::unbounded_channel();

        enc.start(Duration::from_millis(5), tx).unwrap();
        enc.stop();

        let events = collect(&mut rx).await;
        assert_eq!(events, vec![EncoderEvent::Started, EncoderEvent::Stopped]);
    }

    #[tokio::test]
    async fn device_error_is_reported() {
        let (mut enc, sink) = encoder(OutputKind::Wav);
        let (tx, mut rx) = mpsc::unbounded_channel();

        enc.start(Duration::from_millis(5), tx).unwrap();
        sink.lock()
            .unwrap()
            .as_ref()
            .unwrap()
            .send(CaptureMessage::Failed("unplugged".into()))
            .unwrap();

        let events = collect(&mut rx).await;
        assert!(matches!(events.last(), Some(EncoderEvent::Error(m)) if m.contains("unplugged")));
    }
}
