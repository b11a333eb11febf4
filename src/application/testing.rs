//! Hand-written port doubles shared by the application tests

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::format::AudioFormat;

use super::ports::{
    AudioEncoder, CaptureConstraints, CaptureDevice, CaptureError, CaptureStream, Clock,
    DirectoryHandle, DirectoryPicker, EncoderEvent, EncoderEventSender, FileSystemError,
    KeyValueStore, PickerError, StorageError,
};

/// Clock pinned to a settable instant
pub struct FixedClock(AtomicI64);

impl FixedClock {
    pub fn new(now_ms: i64) -> Self {
        Self(AtomicI64::new(now_ms))
    }

    pub fn set(&self, now_ms: i64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Store where every operation fails
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Read("storage disabled".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Write("quota exceeded".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Write("storage disabled".to_string()))
    }
}

#[derive(Default)]
struct DeviceState {
    denial: Mutex<Option<String>>,
    recording_failure: Mutex<Option<String>>,
    supported: Mutex<Vec<String>>,
    last_constraints: Mutex<Option<CaptureConstraints>>,
    last_bitrate: Mutex<Option<u32>>,
    last_timeslice: Mutex<Option<Duration>>,
    events: Mutex<Option<EncoderEventSender>>,
    streams_opened: AtomicUsize,
    tracks_stopped: AtomicUsize,
    encoders_created: AtomicUsize,
    encoder_stops: AtomicUsize,
    manual_stop: AtomicBool,
}

/// Scriptable microphone.
///
/// Chunks are pushed with [`emit`](Self::emit); stopping the encoder
/// delivers [`EncoderEvent::Stopped`] on the same channel unless
/// [`finish_manually`](Self::finish_manually) was called.
#[derive(Clone)]
pub struct FakeDevice {
    state: Arc<DeviceState>,
}

impl FakeDevice {
    /// A device that grants access and supports FLAC and WAV
    pub fn new() -> Self {
        let device = Self {
            state: Arc::new(DeviceState::default()),
        };
        device.support(&["audio/flac", "audio/wav"]);
        device
    }

    pub fn support(&self, mime_types: &[&str]) {
        *self.state.supported.lock().unwrap() =
            mime_types.iter().map(|m| m.to_string()).collect();
    }

    pub fn deny(&self, reason: &str) {
        *self.state.denial.lock().unwrap() = Some(reason.to_string());
    }

    pub fn allow(&self) {
        *self.state.denial.lock().unwrap() = None;
    }

    /// Let the permission check succeed but fail the recording stream
    pub fn fail_recording_stream(&self, reason: &str) {
        *self.state.recording_failure.lock().unwrap() = Some(reason.to_string());
    }

    /// Leave `Stopped` to the test after the encoder is asked to stop
    pub fn finish_manually(&self) {
        self.state.manual_stop.store(true, Ordering::SeqCst);
    }

    /// Deliver an event from the running encoder
    pub fn emit(&self, event: EncoderEvent) {
        if let Some(tx) = self.state.events.lock().unwrap().as_ref() {
            let _ = tx.send(event);
        }
    }

    pub fn streams_opened(&self) -> usize {
        self.state.streams_opened.load(Ordering::SeqCst)
    }

    pub fn tracks_stopped(&self) -> usize {
        self.state.tracks_stopped.load(Ordering::SeqCst)
    }

    pub fn encoders_created(&self) -> usize {
        self.state.encoders_created.load(Ordering::SeqCst)
    }

    pub fn encoder_stops(&self) -> usize {
        self.state.encoder_stops.load(Ordering::SeqCst)
    }

    pub fn last_constraints(&self) -> Option<CaptureConstraints> {
        *self.state.last_constraints.lock().unwrap()
    }

    pub fn last_bitrate(&self) -> Option<u32> {
        *self.state.last_bitrate.lock().unwrap()
    }

    pub fn last_timeslice(&self) -> Option<Duration> {
        *self.state.last_timeslice.lock().unwrap()
    }
}

pub struct FakeStream {
    state: Arc<DeviceState>,
    active: AtomicBool,
}

impl CaptureStream for FakeStream {
    fn stop_tracks(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.state.tracks_stopped.fetch_add(1, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

pub struct FakeEncoder {
    state: Arc<DeviceState>,
    events: Option<EncoderEventSender>,
}

impl AudioEncoder for FakeEncoder {
    fn start(&mut self, timeslice: Duration, events: EncoderEventSender) -> Result<(), CaptureError> {
        *self.state.last_timeslice.lock().unwrap() = Some(timeslice);
        *self.state.events.lock().unwrap() = Some(events.clone());
        let _ = events.send(EncoderEvent::Started);
        self.events = Some(events);
        Ok(())
    }

    fn stop(&mut self) {
        self.state.encoder_stops.fetch_add(1, Ordering::SeqCst);
        if let Some(events) = self.events.take() {
            if !self.state.manual_stop.load(Ordering::SeqCst) {
                let _ = events.send(EncoderEvent::Stopped);
            }
        }
    }

    fn is_inactive(&self) -> bool {
        self.events.is_none()
    }
}

#[async_trait]
impl CaptureDevice for FakeDevice {
    type Stream = FakeStream;
    type Encoder = FakeEncoder;

    async fn request_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<FakeStream, CaptureError> {
        *self.state.last_constraints.lock().unwrap() = Some(*constraints);

        if let Some(reason) = self.state.denial.lock().unwrap().clone() {
            return Err(CaptureError::Denied(reason));
        }
        if constraints.latency.is_some() {
            if let Some(reason) = self.state.recording_failure.lock().unwrap().clone() {
                return Err(CaptureError::StreamFailed(reason));
            }
        }

        self.state.streams_opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeStream {
            state: Arc::clone(&self.state),
            active: AtomicBool::new(true),
        })
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.state
            .supported
            .lock()
            .unwrap()
            .iter()
            .any(|m| m == mime_type)
    }

    fn create_encoder(
        &self,
        _stream: &FakeStream,
        _format: &AudioFormat,
        bitrate: u32,
    ) -> Result<FakeEncoder, CaptureError> {
        *self.state.last_bitrate.lock().unwrap() = Some(bitrate);
        self.state.encoders_created.fetch_add(1, Ordering::SeqCst);
        Ok(FakeEncoder {
            state: Arc::clone(&self.state),
            events: None,
        })
    }
}

/// Directory kept in memory
pub struct MemoryDirectory {
    name: String,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    fail: AtomicBool,
}

impl MemoryDirectory {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            files: Mutex::new(BTreeMap::new()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn file(&self, filename: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(filename).cloned()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DirectoryHandle for MemoryDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write_file(&self, filename: &str, contents: &[u8]) -> Result<(), FileSystemError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FileSystemError::WriteFailed {
                filename: filename.to_string(),
                message: "disk full".to_string(),
            });
        }
        self.files
            .lock()
            .unwrap()
            .insert(filename.to_string(), contents.to_vec());
        Ok(())
    }
}

/// Picker that replays queued answers, then cancels
#[derive(Default)]
pub struct FakePicker {
    answers: Mutex<VecDeque<Result<Arc<dyn DirectoryHandle>, PickerError>>>,
    picks: AtomicUsize,
}

impl FakePicker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn grant(&self, directory: Arc<MemoryDirectory>) {
        let directory: Arc<dyn DirectoryHandle> = directory;
        self.answers.lock().unwrap().push_back(Ok(directory));
    }

    pub fn cancel(&self) {
        self.answers.lock().unwrap().push_back(Err(PickerError::Cancelled));
    }

    pub fn fail(&self, reason: &str) {
        self.answers
            .lock()
            .unwrap()
            .push_back(Err(PickerError::Failed(reason.to_string())));
    }

    pub fn picks(&self) -> usize {
        self.picks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryPicker for FakePicker {
    async fn pick_directory(&self) -> Result<Arc<dyn DirectoryHandle>, PickerError> {
        self.picks.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(PickerError::Cancelled))
    }
}
