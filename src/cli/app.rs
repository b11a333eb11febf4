//! Interactive session runner

use std::env;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;

use clap::error::ErrorKind;
use tracing::{info, warn};

use crate::application::ports::{
    CaptureDevice, Clock, DirectoryPicker, KeyValueStore, SettingsStore,
};
use crate::application::{
    ConfigStore, ControllerSettings, DirectoryAccessManager, DirectoryOutcome, FileSequencer,
    RecordingSessionController, SessionSnapshot,
};
use crate::domain::config::AppConfig;
use crate::domain::error::{ConfigError, SessionError};
use crate::domain::session::SessionState;
use crate::infrastructure::{
    CpalCaptureDevice, FsDirectoryPicker, JsonFileStore, MemoryStore, PromptInput, SystemClock,
};

use super::args::ConfigAction;
use super::commands::{parse_line, SessionCommand};
use super::config_cmd::handle_config_command;
use super::presenter::Presenter;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Environment overrides
pub const ENV_LOG_LEVEL: &str = "AUDIO_STUDIO_LOG_LEVEL";
pub const ENV_STORAGE_PATH: &str = "AUDIO_STUDIO_STORAGE_PATH";

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(
    store: &dyn SettingsStore,
    cli_config: AppConfig,
) -> Result<AppConfig, ConfigError> {
    let file_config = store.load().await?;

    let env_config = AppConfig {
        log_level: env::var(ENV_LOG_LEVEL).ok().filter(|s| !s.is_empty()),
        storage_path: env::var(ENV_STORAGE_PATH).ok().filter(|s| !s.is_empty()),
        ..Default::default()
    };

    // Merge: defaults < file < env < cli
    Ok(AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config))
}

/// Key-value storage for the directory config and counter.
///
/// Falls back to memory when the storage file can't live where configured.
pub async fn open_storage(config: &AppConfig, presenter: &Presenter) -> Arc<dyn KeyValueStore> {
    let path = config.storage_path_or(JsonFileStore::default_path());

    if let Some(parent) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            warn!(path = %path.display(), error = %e, "Falling back to in-memory storage");
            presenter.warn(&format!(
                "Storage unavailable ({}); directory setup and file numbering won't survive a restart",
                e
            ));
            return Arc::new(MemoryStore::new());
        }
    }

    info!(path = %path.display(), "Using storage file");
    Arc::new(JsonFileStore::new(path))
}

/// Run the interactive session on the default microphone
pub async fn run_session(config: AppConfig, settings: Arc<dyn SettingsStore>) -> ExitCode {
    let presenter = Presenter::new();
    let interactive = io::stdin().is_terminal();

    let storage = open_storage(&config, &presenter).await;
    let config_store = Arc::new(ConfigStore::new(storage));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let input = Arc::new(PromptInput::from_stdin());

    let picker = FsDirectoryPicker::new(Arc::clone(&input));
    let picker: Arc<dyn DirectoryPicker> = if interactive {
        Arc::new(picker)
    } else {
        Arc::new(picker.quiet())
    };

    let controller = RecordingSessionController::new(
        Arc::new(CpalCaptureDevice::new()),
        DirectoryAccessManager::new(picker, Arc::clone(&config_store), Arc::clone(&clock)),
        FileSequencer::new(config_store, clock),
        ControllerSettings::from_config(&config),
    );

    // Failures land in the snapshot and are shown in the greeting
    if let Err(e) = controller.initialize().await {
        warn!(error = %e, "Session initialized with errors");
    }

    Repl::new(controller, input, settings)
        .interactive(interactive)
        .run()
        .await
}

enum ReplEvent {
    Line(io::Result<Option<String>>),
    Changed(bool),
    Interrupted,
}

/// Read-eval loop over a session controller
pub struct Repl<D: CaptureDevice> {
    controller: RecordingSessionController<D>,
    input: Arc<PromptInput>,
    settings: Arc<dyn SettingsStore>,
    presenter: Presenter,
    interactive: bool,
}

impl<D: CaptureDevice> Repl<D> {
    pub fn new(
        controller: RecordingSessionController<D>,
        input: Arc<PromptInput>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            controller,
            input,
            settings,
            presenter: Presenter::new(),
            interactive: false,
        }
    }

    /// Show the prompt and the recording spinner
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Process commands until `quit`, end of input or Ctrl+C
    pub async fn run(mut self) -> ExitCode {
        let mut snapshots = self.controller.subscribe();
        let mut shown = snapshots.borrow_and_update().clone();
        let input = Arc::clone(&self.input);
        let mut exit_code = EXIT_SUCCESS;
        let mut needs_prompt = true;

        self.greet(&shown);

        loop {
            if needs_prompt && self.interactive && !self.presenter.is_spinner_active() {
                self.presenter.prompt();
            }
            needs_prompt = false;

            let event = tokio::select! {
                line = input.read_line() => ReplEvent::Line(line),
                changed = snapshots.changed() => ReplEvent::Changed(changed.is_ok()),
                _ = tokio::signal::ctrl_c() => ReplEvent::Interrupted,
            };

            match event {
                ReplEvent::Line(Ok(Some(line))) => {
                    needs_prompt = true;
                    match parse_line(&line) {
                        Ok(None) => {}
                        Ok(Some(SessionCommand::Quit)) => break,
                        Ok(Some(command)) => self.execute(command).await,
                        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp) => {
                            self.presenter.output(e.to_string().trim_end());
                        }
                        Err(e) => self.presenter.error(
                            e.to_string()
                                .trim_start_matches("error: ")
                                .trim_end(),
                        ),
                    }
                    // The command already reported what it changed
                    let current = snapshots.borrow_and_update().clone();
                    self.sync_spinner(&current);
                    shown = current;
                }
                ReplEvent::Line(Ok(None)) => break,
                ReplEvent::Line(Err(e)) => {
                    self.presenter.error(&format!("Failed to read input: {}", e));
                    exit_code = EXIT_ERROR;
                    break;
                }
                ReplEvent::Changed(true) => {
                    let current = snapshots.borrow_and_update().clone();
                    self.render_change(&shown, &current);
                    shown = current;
                }
                ReplEvent::Changed(false) => break,
                ReplEvent::Interrupted => {
                    self.presenter.stop_spinner();
                    self.presenter.info("Interrupted");
                    break;
                }
            }
        }

        self.finish().await;
        ExitCode::from(exit_code)
    }

    fn greet(&self, snapshot: &SessionSnapshot) {
        self.presenter.info(&format!(
            "Audio Studio ready on {}",
            snapshot.platform.label()
        ));
        if let Some(ref format) = snapshot.selected_format {
            self.presenter
                .info(&format!("Recording format: {}", format.display_name));
        }
        if let Some(ref error) = snapshot.error {
            self.presenter.warn(error);
        }

        let setup = &snapshot.setup_status;
        match setup.directory_name.as_deref() {
            Some(name) if setup.is_configured => self.presenter.info(&format!(
                "Previously used directory '{}': run `restore` to grant access again",
                name
            )),
            _ => self
                .presenter
                .info("Run `setup` to choose where takes are saved"),
        }
        self.presenter.info("Type `help` for commands");
    }

    async fn execute(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Setup => {
                let result = self.controller.setup_directory().await;
                self.report_directory(result);
            }
            SessionCommand::Restore => {
                let snapshot = self.controller.snapshot();
                if let Some(name) = snapshot.setup_status.directory_name.as_deref() {
                    self.presenter
                        .info(&format!("Select '{}' again to restore access", name));
                }
                let result = self.controller.restore_directory().await;
                self.report_directory(result);
            }
            SessionCommand::Start => match self.controller.start().await {
                Ok(()) => {
                    let snapshot = self.controller.snapshot();
                    if self.interactive {
                        let message = self.presenter.recording_message(&snapshot);
                        self.presenter.start_spinner(&message);
                    } else {
                        self.presenter.info("Recording started");
                    }
                }
                Err(e) => self.presenter.error(&e.to_string()),
            },
            SessionCommand::Stop => {
                self.presenter.update_spinner("Finishing take...");
                let result = self.controller.stop().await;
                self.presenter.stop_spinner();
                match result {
                    Ok(Some(recording)) => self.presenter.success(&format!(
                        "Saved {} ({}, {}s) to {}",
                        recording.filename,
                        recording.human_readable_size(),
                        recording.duration_seconds,
                        recording.directory_name
                    )),
                    Ok(None) => self.presenter.info("Already stopping"),
                    Err(e) => self.presenter.error(&e.to_string()),
                }
            }
            SessionCommand::Status => self.presenter.status(&self.controller.snapshot()),
            SessionCommand::List => self
                .presenter
                .recordings(&self.controller.snapshot().recordings),
            SessionCommand::Remove { index } => {
                let removed = match index.checked_sub(1) {
                    Some(position) => self.controller.remove_recording(position).await,
                    None => None,
                };
                match removed {
                    Some(recording) => self.presenter.success(&format!(
                        "Removed {} from the list (the file stays on disk)",
                        recording.filename
                    )),
                    None => self.presenter.error(&format!("No recording #{}", index)),
                }
            }
            SessionCommand::Reset => match self.controller.reset_counter().await {
                Ok(()) => self.presenter.success("File numbering restarts at 1"),
                Err(e) => self.presenter.error(&e.to_string()),
            },
            SessionCommand::Forget => match self.controller.forget_directory().await {
                Ok(()) => self
                    .presenter
                    .success("Directory forgotten; run setup after the next launch"),
                Err(e) => self.presenter.error(&e.to_string()),
            },
            SessionCommand::Dismiss => {
                self.controller.dismiss_error().await;
                self.presenter.info("Error cleared");
            }
            SessionCommand::Permission => match self.controller.request_permission().await {
                Ok(()) => self.presenter.success("Microphone access granted"),
                Err(e) => self.presenter.error(&e.to_string()),
            },
            SessionCommand::Config { action } => {
                let is_change = matches!(action, ConfigAction::Init | ConfigAction::Set { .. });
                match handle_config_command(action, self.settings.as_ref(), &self.presenter).await
                {
                    Ok(()) if is_change => self
                        .presenter
                        .info("Changes apply the next time audio-studio starts"),
                    Ok(()) => {}
                    Err(e) => self.presenter.error(&e.to_string()),
                }
            }
            SessionCommand::Quit => {}
        }
    }

    fn report_directory(&self, result: Result<DirectoryOutcome, SessionError>) {
        match result {
            Ok(DirectoryOutcome::Granted(handle)) => self.presenter.success(&format!(
                "Takes will be saved to '{}'",
                handle.name()
            )),
            Ok(DirectoryOutcome::Declined) => {
                self.presenter.warn("Directory selection cancelled")
            }
            Err(e) => self.presenter.error(&e.to_string()),
        }
    }

    /// Spinner follows the session state
    fn sync_spinner(&mut self, snapshot: &SessionSnapshot) {
        if !self.interactive {
            return;
        }
        match snapshot.state {
            SessionState::Recording => {
                let message = self.presenter.recording_message(snapshot);
                if self.presenter.is_spinner_active() {
                    self.presenter.update_spinner(&message);
                } else {
                    self.presenter.start_spinner(&message);
                }
            }
            SessionState::Stopping => self.presenter.update_spinner("Finishing take..."),
            SessionState::Idle | SessionState::AcquiringPermission => {
                self.presenter.stop_spinner()
            }
        }
    }

    /// Report changes that happened while waiting for input
    fn render_change(&mut self, previous: &SessionSnapshot, current: &SessionSnapshot) {
        self.sync_spinner(current);

        if current.recordings.len() > previous.recordings.len() {
            if let Some(recording) = current.recordings.last() {
                self.presenter.success(&format!(
                    "Saved {} ({})",
                    recording.filename,
                    recording.human_readable_size()
                ));
            }
        }

        if current.error != previous.error {
            if let Some(ref error) = current.error {
                self.presenter.error(error);
            }
        }
    }

    /// Save a take still in progress, then release the device
    async fn finish(&mut self) {
        if self.controller.snapshot().state == SessionState::Recording {
            self.presenter.update_spinner("Saving the take in progress...");
            let result = self.controller.stop().await;
            self.presenter.stop_spinner();
            match result {
                Ok(Some(recording)) => self
                    .presenter
                    .success(&format!("Saved {}", recording.filename)),
                Ok(None) => {}
                Err(e) => self.presenter.error(&e.to_string()),
            }
        }
        self.presenter.stop_spinner();
        self.controller.shutdown().await;
        info!("Session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::XdgSettingsStore;
    use tempfile::tempdir;

    #[tokio::test]
    async fn flags_override_file_and_defaults_fill_gaps() {
        let dir = tempdir().unwrap();
        let store = XdgSettingsStore::with_path(dir.path().join("config.toml"));
        store
            .save(&AppConfig {
                bitrate: Some(128_000),
                timeslice_ms: Some(100),
                ..Default::default()
            })
            .await
            .unwrap();

        let cli = AppConfig {
            timeslice_ms: Some(20),
            ..Default::default()
        };
        let config = load_merged_config(&store, cli).await.unwrap();

        assert_eq!(config.bitrate, Some(128_000));
        assert_eq!(config.timeslice_ms, Some(20));
        assert_eq!(config.stop_grace_ms, Some(1000));
    }

    #[tokio::test]
    async fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = XdgSettingsStore::with_path(dir.path().join("config.toml"));

        let config = load_merged_config(&store, AppConfig::empty()).await.unwrap();
        assert_eq!(config.bitrate_or_default(), 320_000);
        assert_eq!(config.timeslice_ms, Some(50));
    }

    #[tokio::test]
    async fn storage_directory_is_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        let config = AppConfig {
            storage_path: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };

        let storage = open_storage(&config, &Presenter::new()).await;
        storage.set("key", "value").await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn unusable_storage_path_falls_back_to_memory() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let path = blocker.join("sub").join("storage.json");
        let config = AppConfig {
            storage_path: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };

        let storage = open_storage(&config, &Presenter::new()).await;
        storage.set("key", "value").await.unwrap();
        assert_eq!(storage.get("key").await.unwrap().as_deref(), Some("value"));
        assert!(!path.exists());
    }
}
