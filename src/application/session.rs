//! Recording session controller
//!
//! Owns the session lifecycle:
//!   Idle -> AcquiringPermission -> Recording -> Stopping -> Idle
//!
//! Encoder callbacks arrive as [`EncoderEvent`] messages and are pumped into
//! the controller by one task per take. A generation counter tags every take
//! so events and ticks from a torn-down take are ignored.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::domain::config::AppConfig;
use crate::domain::directory::DirectoryConfig;
use crate::domain::error::SessionError;
use crate::domain::format::AudioFormat;
use crate::domain::platform::PlatformOs;
use crate::domain::recording::{AudioPayload, PersistedRecording};
use crate::domain::session::{
    InvalidStateTransition, PermissionStatus, RecordingSession, SessionState,
};

use super::directory::{DirectoryAccessManager, DirectoryOutcome};
use super::negotiator::FormatNegotiator;
use super::permission::PermissionGate;
use super::ports::{
    AudioEncoder, CaptureConstraints, CaptureDevice, CaptureStream, DirectoryHandle, EncoderEvent,
};
use super::sequencer::{FileSequencer, FIRST_FILE_NUMBER};
use super::writer::{AudioFileWriter, RecordingMetadata};

/// Interval of the elapsed-time counter
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How long a stopping encoder may go without delivering any event.
///
/// A finalize that keeps delivering chunks is waited for indefinitely.
pub const FINALIZE_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Recording parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub bitrate: u32,
    pub timeslice: Duration,
    pub stop_grace: Duration,
}

impl ControllerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            bitrate: config.bitrate_or_default(),
            timeslice: config.timeslice_or_default(),
            stop_grace: config.stop_grace_or_default(),
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::empty())
    }
}

/// Everything a view needs to render the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub elapsed_seconds: u64,
    pub permission: PermissionStatus,
    pub supported_formats: Vec<AudioFormat>,
    pub selected_format: Option<AudioFormat>,
    pub platform: PlatformOs,
    /// Name of the directory takes are written to, if one is granted
    pub directory_name: Option<String>,
    pub setup_status: DirectoryConfig,
    pub next_file_number: u64,
    pub recordings: Vec<PersistedRecording>,
    pub error: Option<String>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            elapsed_seconds: 0,
            permission: PermissionStatus::Checking,
            supported_formats: Vec::new(),
            selected_format: None,
            platform: PlatformOs::Unknown,
            directory_name: None,
            setup_status: DirectoryConfig::unconfigured(),
            next_file_number: FIRST_FILE_NUMBER,
            recordings: Vec::new(),
            error: None,
        }
    }
}

type FinalizeResult = Result<Option<PersistedRecording>, SessionError>;

/// Resources owned by the take in progress
struct ActiveTake<D: CaptureDevice> {
    stream: D::Stream,
    encoder: D::Encoder,
    ticker: JoinHandle<()>,
    format: AudioFormat,
    chunks: Vec<Vec<u8>>,
    events_seen: u64,
    finalized: bool,
    finalize_tx: Option<oneshot::Sender<FinalizeResult>>,
}

struct Inner<D: CaptureDevice> {
    session: RecordingSession,
    permission: PermissionGate<D>,
    negotiator: FormatNegotiator,
    platform: PlatformOs,
    directory: Option<Arc<dyn DirectoryHandle>>,
    setup_status: DirectoryConfig,
    next_file_number: u64,
    recordings: Vec<PersistedRecording>,
    error: Option<SessionError>,
    generation: u64,
    take: Option<ActiveTake<D>>,
}

impl<D: CaptureDevice> Inner<D> {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.session.state(),
            elapsed_seconds: self.session.elapsed_seconds(),
            permission: self.permission.status(),
            supported_formats: self.negotiator.supported().to_vec(),
            selected_format: self.negotiator.selected().cloned(),
            platform: self.platform,
            directory_name: self.directory.as_ref().map(|d| d.name().to_string()),
            setup_status: self.setup_status.clone(),
            next_file_number: self.next_file_number,
            recordings: self.recordings.clone(),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }

    /// Release the take's stream, encoder and tick. Safe to call repeatedly.
    fn teardown(&mut self) {
        let Some(mut take) = self.take.take() else {
            return;
        };

        take.ticker.abort();
        if !take.encoder.is_inactive() {
            take.encoder.stop();
        }
        take.stream.stop_tracks();
        self.generation += 1;
        debug!(generation = self.generation, "Take resources released");
    }

    fn invalid(&self, action: &str) -> SessionError {
        InvalidStateTransition {
            current_state: self.session.state(),
            action: action.to_string(),
        }
        .into()
    }
}

struct Shared<D: CaptureDevice> {
    device: Arc<D>,
    directories: DirectoryAccessManager,
    sequencer: FileSequencer,
    settings: ControllerSettings,
    inner: Mutex<Inner<D>>,
    snapshots: watch::Sender<SessionSnapshot>,
}

/// Drives one recording session at a time. Cheap to clone.
pub struct RecordingSessionController<D: CaptureDevice> {
    shared: Arc<Shared<D>>,
}

impl<D: CaptureDevice> Clone for RecordingSessionController<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<D: CaptureDevice> RecordingSessionController<D> {
    pub fn new(
        device: Arc<D>,
        directories: DirectoryAccessManager,
        sequencer: FileSequencer,
        settings: ControllerSettings,
    ) -> Self {
        let inner = Inner {
            session: RecordingSession::new(),
            permission: PermissionGate::new(Arc::clone(&device)),
            negotiator: FormatNegotiator::new(),
            platform: PlatformOs::current(),
            directory: None,
            setup_status: DirectoryConfig::unconfigured(),
            next_file_number: FIRST_FILE_NUMBER,
            recordings: Vec::new(),
            error: None,
            generation: 0,
            take: None,
        };
        let (snapshots, _) = watch::channel(inner.snapshot());

        Self {
            shared: Arc::new(Shared {
                device,
                directories,
                sequencer,
                settings,
                inner: Mutex::new(inner),
                snapshots,
            }),
        }
    }

    /// Receive a snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// The latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    fn publish(&self, inner: &Inner<D>) {
        self.shared.snapshots.send_replace(inner.snapshot());
    }

    /// Record `error` in the error slot, publish and hand it back
    fn fail(&self, inner: &mut Inner<D>, error: SessionError) -> SessionError {
        error!(error = %error, state = %inner.session.state(), "Session error");
        inner.error = Some(error.clone());
        self.publish(inner);
        error
    }

    async fn refresh_next_file_number(&self, inner: &mut Inner<D>) {
        match self.shared.sequencer.peek().await {
            Ok(next) => inner.next_file_number = next,
            Err(e) => warn!(error = %e, "Could not read file counter"),
        }
    }

    /// Start-up: permission, format negotiation, platform, cached directory
    /// config and counter.
    ///
    /// Failures are recorded but do not prevent the session from being used;
    /// `start()` reports them again.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        let mut inner = self.shared.inner.lock().await;

        let permission = inner.permission.ensure_microphone_access().await;

        let device = &self.shared.device;
        let negotiation = inner
            .negotiator
            .negotiate(|mime_type| device.is_type_supported(mime_type))
            .map(|_| ());

        inner.platform = PlatformOs::current();
        inner.setup_status = self
            .shared
            .directories
            .load_cached(inner.platform)
            .await
            .unwrap_or_else(DirectoryConfig::unconfigured);
        self.refresh_next_file_number(&mut inner).await;

        info!(
            platform = %inner.platform,
            permission = %inner.permission.status(),
            format = ?inner.negotiator.selected().map(|f| f.display_name),
            configured = inner.setup_status.is_configured,
            next_file = inner.next_file_number,
            "Session initialized"
        );

        if let Err(e) = permission.and(negotiation) {
            return Err(self.fail(&mut inner, e));
        }
        self.publish(&inner);
        Ok(())
    }

    /// Ask for microphone access again
    pub async fn request_permission(&self) -> Result<(), SessionError> {
        let mut inner = self.shared.inner.lock().await;
        let result = inner.permission.ensure_microphone_access().await;
        match result {
            Ok(()) => {
                if matches!(inner.error, Some(SessionError::PermissionDenied(_))) {
                    inner.error = None;
                }
                self.publish(&inner);
                Ok(())
            }
            Err(e) => Err(self.fail(&mut inner, e)),
        }
    }

    /// Begin a take
    pub async fn start(&self) -> Result<(), SessionError> {
        let mut inner = self.shared.inner.lock().await;

        if !inner.session.is_idle() {
            let err = inner.invalid("start recording");
            return Err(self.fail(&mut inner, err));
        }

        inner.error = None;
        inner.teardown();

        if !inner.permission.status().is_granted() {
            inner.session.acquire_permission()?;
            self.publish(&inner);

            if let Err(e) = inner.permission.ensure_microphone_access().await {
                inner.session.reset();
                return Err(self.fail(&mut inner, e));
            }
        }

        let Some(format) = inner.negotiator.selected().cloned() else {
            inner.session.reset();
            return Err(self.fail(&mut inner, SessionError::NoSupportedFormat));
        };
        if inner.directory.is_none() {
            inner.session.reset();
            return Err(self.fail(&mut inner, SessionError::DirectoryUnavailable));
        }

        let (stream, encoder, events) = match self.open_take(&format).await {
            Ok(opened) => opened,
            Err(e) => {
                inner.session.reset();
                return Err(self.fail(&mut inner, e));
            }
        };

        inner.session.start_recording()?;
        inner.generation += 1;
        let generation = inner.generation;

        let ticker = self.spawn_ticker(generation);
        self.spawn_pump(generation, events);

        inner.take = Some(ActiveTake {
            stream,
            encoder,
            ticker,
            format,
            chunks: Vec::new(),
            events_seen: 0,
            finalized: false,
            finalize_tx: None,
        });

        info!(
            generation,
            format = inner.take.as_ref().map(|t| t.format.display_name),
            bitrate = self.shared.settings.bitrate,
            "Recording started"
        );
        self.publish(&inner);
        Ok(())
    }

    async fn open_take(
        &self,
        format: &AudioFormat,
    ) -> Result<
        (
            D::Stream,
            D::Encoder,
            mpsc::UnboundedReceiver<EncoderEvent>,
        ),
        SessionError,
    > {
        let device = &self.shared.device;
        let settings = &self.shared.settings;

        let stream = device
            .request_stream(&CaptureConstraints::high_fidelity())
            .await
            .map_err(|e| SessionError::StartFailed(e.to_string()))?;

        let mut encoder = match device.create_encoder(&stream, format, settings.bitrate) {
            Ok(encoder) => encoder,
            Err(e) => {
                stream.stop_tracks();
                return Err(SessionError::StartFailed(e.to_string()));
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if let Err(e) = encoder.start(settings.timeslice, tx) {
            stream.stop_tracks();
            return Err(SessionError::StartFailed(e.to_string()));
        }

        Ok((stream, encoder, rx))
    }

    fn spawn_ticker(&self, generation: u64) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
            loop {
                interval.tick().await;
                if !controller.tick(generation).await {
                    break;
                }
            }
        })
    }

    async fn tick(&self, generation: u64) -> bool {
        let mut inner = self.shared.inner.lock().await;
        if inner.generation != generation || !inner.session.tick() {
            return false;
        }
        self.publish(&inner);
        true
    }

    fn spawn_pump(&self, generation: u64, mut events: mpsc::UnboundedReceiver<EncoderEvent>) {
        let controller = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if !controller.handle_event(generation, event).await {
                    return;
                }
            }
            // A closed channel means the encoder is gone
            controller.handle_event(generation, EncoderEvent::Stopped).await;
        });
    }

    /// Apply one encoder event. Returns false once the take is over.
    async fn handle_event(&self, generation: u64, event: EncoderEvent) -> bool {
        let mut inner = self.shared.inner.lock().await;
        if inner.generation != generation {
            return false;
        }
        let Some(take) = inner.take.as_mut() else {
            return false;
        };
        take.events_seen += 1;

        match event {
            EncoderEvent::Started => {
                debug!(generation, "Encoder started");
                true
            }
            EncoderEvent::Data(chunk) => {
                if !chunk.is_empty() && !take.finalized {
                    take.chunks.push(chunk);
                }
                true
            }
            EncoderEvent::Error(message) => {
                let waiter = take.finalize_tx.take();
                inner.teardown();
                inner.session.reset();
                let err = self.fail(&mut inner, SessionError::CaptureRuntime(message));
                if let Some(waiter) = waiter {
                    let _ = waiter.send(Err(err));
                }
                false
            }
            EncoderEvent::Stopped => {
                if take.finalized {
                    return true;
                }
                take.finalized = true;
                let chunks = std::mem::take(&mut take.chunks);
                let format = take.format.clone();
                let waiter = take.finalize_tx.take();

                let outcome = self.finalize(&mut inner, chunks, &format).await;

                // The encoder ended on its own while still recording
                let unexpected = inner.session.is_recording();
                if unexpected {
                    warn!(generation, "Encoder stopped without a stop request");
                    inner.teardown();
                    inner.session.reset();
                }
                self.publish(&inner);

                if let Some(waiter) = waiter {
                    let _ = waiter.send(outcome);
                }
                !unexpected
            }
        }
    }

    /// Join the chunks and write them as the next numbered file
    async fn finalize(
        &self,
        inner: &mut Inner<D>,
        chunks: Vec<Vec<u8>>,
        format: &AudioFormat,
    ) -> FinalizeResult {
        if chunks.is_empty() {
            warn!("Stop reached without any audio data");
            return Err(self.fail(inner, SessionError::NoAudioCaptured));
        }

        let payload = AudioPayload::from_chunks(chunks);
        let file_number = self.shared.sequencer.next().await;
        let writer = AudioFileWriter::new(inner.directory.clone());
        let metadata = RecordingMetadata {
            format,
            duration_seconds: inner.session.elapsed_seconds(),
        };

        let result = writer.write(&payload, file_number, metadata).await;
        self.refresh_next_file_number(inner).await;

        match result {
            Ok(recording) => {
                inner.recordings.push(recording.clone());
                Ok(Some(recording))
            }
            Err(e) => Err(self.fail(inner, e)),
        }
    }

    /// Finish the take.
    ///
    /// Returns the written recording, `Ok(None)` if a stop is already in
    /// progress. Teardown waits for both the grace delay and finalization.
    pub async fn stop(&self) -> Result<Option<PersistedRecording>, SessionError> {
        let (generation, finalized) = {
            let mut inner = self.shared.inner.lock().await;

            if inner.session.is_stopping() {
                debug!("Stop already in progress");
                return Ok(None);
            }
            if let Err(e) = inner.session.stop_recording() {
                return Err(self.fail(&mut inner, e.into()));
            }

            let (tx, rx) = oneshot::channel();
            if let Some(take) = inner.take.as_mut() {
                take.ticker.abort();
                take.finalize_tx = Some(tx);
                take.encoder.stop();
            }
            info!(elapsed = inner.session.elapsed_seconds(), "Stopping recording");
            self.publish(&inner);
            (inner.generation, rx)
        };

        let (_, outcome) = tokio::join!(
            sleep(self.shared.settings.stop_grace),
            self.await_finalize(generation, finalized)
        );

        let mut inner = self.shared.inner.lock().await;
        let outcome = match outcome {
            Some(Ok(result)) => result,
            // Finalization was abandoned by a teardown elsewhere
            Some(Err(_)) => Ok(None),
            None => Err(self.fail(
                &mut inner,
                SessionError::CaptureRuntime("encoder did not finalize".to_string()),
            )),
        };

        if inner.generation == generation {
            inner.teardown();
            inner.session.reset();
            self.publish(&inner);
        }
        debug!(state = %inner.session.state(), "Stop complete");
        outcome
    }

    /// Wait for the finalize result while the encoder keeps making progress.
    ///
    /// `None` once the encoder has been silent for [`FINALIZE_IDLE_TIMEOUT`].
    async fn await_finalize(
        &self,
        generation: u64,
        mut finalized: oneshot::Receiver<FinalizeResult>,
    ) -> Option<Result<FinalizeResult, oneshot::error::RecvError>> {
        let mut seen = self.events_seen(generation).await;
        loop {
            match tokio::time::timeout(FINALIZE_IDLE_TIMEOUT, &mut finalized).await {
                Ok(result) => return Some(result),
                Err(_) => {
                    let now = self.events_seen(generation).await;
                    if now == seen {
                        warn!(generation, "Encoder went silent while finalizing");
                        return None;
                    }
                    debug!(generation, events = now - seen, "Encoder still finalizing");
                    seen = now;
                }
            }
        }
    }

    async fn events_seen(&self, generation: u64) -> u64 {
        let inner = self.shared.inner.lock().await;
        match inner.take.as_ref() {
            Some(take) if inner.generation == generation => take.events_seen,
            _ => 0,
        }
    }

    /// Prompt for an output directory and write the notes file into it
    pub async fn setup_directory(&self) -> Result<DirectoryOutcome, SessionError> {
        let platform = self.shared.inner.lock().await.platform;
        let result = self.shared.directories.setup(platform).await;
        self.apply_directory(result, platform).await
    }

    /// Re-grant the directory remembered from an earlier session
    pub async fn restore_directory(&self) -> Result<DirectoryOutcome, SessionError> {
        let platform = self.shared.inner.lock().await.platform;
        let result = self.shared.directories.restore(platform).await;
        self.apply_directory(result, platform).await
    }

    async fn apply_directory(
        &self,
        result: Result<DirectoryOutcome, SessionError>,
        platform: PlatformOs,
    ) -> Result<DirectoryOutcome, SessionError> {
        let mut inner = self.shared.inner.lock().await;
        match result {
            Ok(DirectoryOutcome::Granted(handle)) => {
                inner.directory = Some(Arc::clone(&handle));
                inner.setup_status = self
                    .shared
                    .directories
                    .load_cached(platform)
                    .await
                    .unwrap_or_else(|| self.shared.directories.verified_now(handle.name(), platform));
                if matches!(
                    inner.error,
                    Some(SessionError::DirectoryUnavailable | SessionError::DirectoryAccess(_))
                ) {
                    inner.error = None;
                }
                self.publish(&inner);
                Ok(DirectoryOutcome::Granted(handle))
            }
            Ok(DirectoryOutcome::Declined) => Ok(DirectoryOutcome::Declined),
            Err(e) => Err(self.fail(&mut inner, e)),
        }
    }

    /// Forget the remembered directory. A directory granted in this
    /// session stays usable until the process exits.
    pub async fn forget_directory(&self) -> Result<(), SessionError> {
        let mut inner = self.shared.inner.lock().await;
        if let Err(e) = self.shared.directories.clear().await {
            return Err(self.fail(&mut inner, e));
        }
        inner.setup_status = DirectoryConfig::unconfigured();
        info!("Remembered directory forgotten");
        self.publish(&inner);
        Ok(())
    }

    /// Restart file numbering at 1
    pub async fn reset_counter(&self) -> Result<(), SessionError> {
        let mut inner = self.shared.inner.lock().await;
        if let Err(e) = self.shared.sequencer.reset().await {
            return Err(self.fail(&mut inner, SessionError::StorageFailure(e.to_string())));
        }
        inner.next_file_number = FIRST_FILE_NUMBER;
        self.publish(&inner);
        Ok(())
    }

    /// Drop an entry from the in-memory list. The file stays on disk.
    pub async fn remove_recording(&self, index: usize) -> Option<PersistedRecording> {
        let mut inner = self.shared.inner.lock().await;
        if index >= inner.recordings.len() {
            return None;
        }
        let removed = inner.recordings.remove(index);
        debug!(filename = %removed.filename, "Recording removed from list");
        self.publish(&inner);
        Some(removed)
    }

    /// Clear the error slot
    pub async fn dismiss_error(&self) {
        let mut inner = self.shared.inner.lock().await;
        if inner.error.take().is_some() {
            self.publish(&inner);
        }
    }

    /// Abandon any take in progress and release the device
    pub async fn shutdown(&self) {
        let mut inner = self.shared.inner.lock().await;
        if inner.take.is_some() {
            warn!(state = %inner.session.state(), "Shutting down with a take in progress");
        }
        inner.teardown();
        inner.session.reset();
        self.publish(&inner);
    }
}
