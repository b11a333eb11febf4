//! Output directory access and its cached configuration

use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::domain::directory::DirectoryConfig;
use crate::domain::error::SessionError;
use crate::domain::format::OUTPUT_EXTENSION;
use crate::domain::platform::PlatformOs;

use super::config_store::ConfigStore;
use super::ports::{Clock, DirectoryHandle, DirectoryPicker, PickerError, StorageError};

/// Name of the notes file written into a freshly granted directory
pub const NOTES_FILENAME: &str = "README.md";

/// Result of asking the user for a directory
pub enum DirectoryOutcome {
    Granted(Arc<dyn DirectoryHandle>),
    /// The user dismissed the picker. Nothing changed.
    Declined,
}

impl DirectoryOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

impl std::fmt::Debug for DirectoryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Granted(handle) => f.debug_tuple("Granted").field(&handle.name()).finish(),
            Self::Declined => f.write_str("Declined"),
        }
    }
}

/// Obtains writable directory handles and remembers the last grant
pub struct DirectoryAccessManager {
    picker: Arc<dyn DirectoryPicker>,
    config: Arc<ConfigStore>,
    clock: Arc<dyn Clock>,
}

impl DirectoryAccessManager {
    pub fn new(
        picker: Arc<dyn DirectoryPicker>,
        config: Arc<ConfigStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            picker,
            config,
            clock,
        }
    }

    /// Ask for a directory, write the notes file into it and remember it.
    pub async fn setup(&self, platform: PlatformOs) -> Result<DirectoryOutcome, SessionError> {
        let Some(handle) = self.pick().await? else {
            return Ok(DirectoryOutcome::Declined);
        };

        let now_ms = self.clock.now_ms();
        let notes = integration_notes(handle.name(), platform, &local_time(now_ms));
        handle
            .write_file(NOTES_FILENAME, notes.as_bytes())
            .await
            .map_err(|e| SessionError::DirectoryAccess(e.to_string()))?;

        self.remember(handle.name(), platform, now_ms).await;
        info!(directory = handle.name(), platform = %platform, "Directory setup complete");
        Ok(DirectoryOutcome::Granted(handle))
    }

    /// Re-grant the previously configured directory.
    ///
    /// Handles are never cached, so this always prompts again. Only allowed
    /// while a usable configuration exists.
    pub async fn restore(&self, platform: PlatformOs) -> Result<DirectoryOutcome, SessionError> {
        let Some(cached) = self.load_cached(platform).await else {
            return Err(SessionError::DirectoryUnavailable);
        };
        debug!(previous = ?cached.directory_name, "Restoring working directory");

        let Some(handle) = self.pick().await? else {
            return Ok(DirectoryOutcome::Declined);
        };

        self.remember(handle.name(), platform, self.clock.now_ms()).await;
        info!(directory = handle.name(), "Working directory restored");
        Ok(DirectoryOutcome::Granted(handle))
    }

    /// Load the stored configuration if it is still usable on `platform`.
    ///
    /// Stale, foreign or unreadable configurations are removed.
    pub async fn load_cached(&self, platform: PlatformOs) -> Option<DirectoryConfig> {
        match self.config.load_directory_config().await {
            Ok(Some(config)) if config.is_usable(self.clock.now_ms(), platform) => {
                debug!(directory = ?config.directory_name, "Using cached directory config");
                Some(config)
            }
            Ok(Some(config)) => {
                info!(
                    directory = ?config.directory_name,
                    stored_platform = %config.platform_os,
                    "Directory config expired or from another platform, clearing"
                );
                self.discard().await;
                None
            }
            Ok(None) => None,
            Err(e @ StorageError::Corrupt { .. }) => {
                warn!(error = %e, "Discarding unreadable directory config");
                self.discard().await;
                None
            }
            Err(e) => {
                warn!(error = %e, "Directory config unavailable");
                None
            }
        }
    }

    /// Forget the stored configuration
    pub async fn clear(&self) -> Result<(), SessionError> {
        self.config
            .clear_directory_config()
            .await
            .map_err(|e| SessionError::StorageFailure(e.to_string()))
    }

    async fn pick(&self) -> Result<Option<Arc<dyn DirectoryHandle>>, SessionError> {
        match self.picker.pick_directory().await {
            Ok(handle) => Ok(Some(handle)),
            Err(PickerError::Cancelled) => {
                warn!("Directory selection declined");
                Ok(None)
            }
            Err(PickerError::Failed(message)) => Err(SessionError::DirectoryAccess(message)),
        }
    }

    /// A configuration for `name` verified at the current time
    pub fn verified_now(&self, name: &str, platform: PlatformOs) -> DirectoryConfig {
        DirectoryConfig::verified(name, platform, self.clock.now_ms())
    }

    async fn remember(&self, name: &str, platform: PlatformOs, now_ms: i64) {
        let config = DirectoryConfig::verified(name, platform, now_ms);
        // The grant is still good for this session without the cache
        if let Err(e) = self.config.save_directory_config(&config).await {
            warn!(error = %e, "Failed to cache directory config");
        }
    }

    async fn discard(&self) {
        if let Err(e) = self.config.clear_directory_config().await {
            warn!(error = %e, "Failed to clear directory config");
        }
    }
}

fn local_time(now_ms: i64) -> String {
    DateTime::from_timestamp_millis(now_ms)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| now_ms.to_string())
}

/// Notes for whoever wires up the external watchdog
pub fn integration_notes(directory: &str, platform: PlatformOs, setup_date: &str) -> String {
    let pattern = format!("1.{OUTPUT_EXTENSION}, 2.{OUTPUT_EXTENSION}, 3.{OUTPUT_EXTENSION}, ...");

    format!(
        "# Audio Studio - Watchdog Integration\n\
         \n\
         **Directory:** {directory}\n\
         **Platform:** {platform}\n\
         **Setup Date:** {setup_date}\n\
         \n\
         ## File Pattern\n\
         \n\
         - Takes are written as {pattern}\n\
         - Numbers are consecutive and survive restarts; they start again at 1 after a counter reset\n\
         - The extension is the same for every recording format\n\
         - A file is complete once it appears; nothing else is written here\n\
         \n\
         ## Watchdog\n\
         \n\
         An external process is expected to pick up new takes, convert them and clean up.\n\
         The directory setting is remembered for 7 days on this platform.\n",
        platform = platform.label(),
    )
}
