//! Application configuration value object

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default encoder bitrate, high enough for downstream processing
pub const DEFAULT_BITRATE: u32 = 320_000;

/// Default encoder time-slice in milliseconds
pub const DEFAULT_TIMESLICE_MS: u64 = 50;

/// Default grace delay between stop and teardown in milliseconds
pub const DEFAULT_STOP_GRACE_MS: u64 = 1000;

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub bitrate: Option<u32>,
    pub timeslice_ms: Option<u64>,
    pub stop_grace_ms: Option<u64>,
    pub log_level: Option<String>,
    pub storage_path: Option<String>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            bitrate: Some(DEFAULT_BITRATE),
            timeslice_ms: Some(DEFAULT_TIMESLICE_MS),
            stop_grace_ms: Some(DEFAULT_STOP_GRACE_MS),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
            storage_path: None,
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            bitrate: other.bitrate.or(self.bitrate),
            timeslice_ms: other.timeslice_ms.or(self.timeslice_ms),
            stop_grace_ms: other.stop_grace_ms.or(self.stop_grace_ms),
            log_level: other.log_level.or(self.log_level),
            storage_path: other.storage_path.or(self.storage_path),
        }
    }

    /// Get encoder bitrate, or default if not set/zero
    pub fn bitrate_or_default(&self) -> u32 {
        self.bitrate.filter(|b| *b > 0).unwrap_or(DEFAULT_BITRATE)
    }

    /// Get encoder time-slice, or default if not set/zero
    pub fn timeslice_or_default(&self) -> Duration {
        Duration::from_millis(
            self.timeslice_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_TIMESLICE_MS),
        )
    }

    /// Get stop grace delay, or default if not set
    pub fn stop_grace_or_default(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms.unwrap_or(DEFAULT_STOP_GRACE_MS))
    }

    /// Get log level, or "info" if not set
    pub fn log_level_or_default(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Get the key-value storage file, falling back to the given default
    pub fn storage_path_or(&self, default: PathBuf) -> PathBuf {
        self.storage_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_expected_values() {
        let config = AppConfig::defaults();
        assert_eq!(config.bitrate, Some(320_000));
        assert_eq!(config.timeslice_ms, Some(50));
        assert_eq!(config.stop_grace_ms, Some(1000));
        assert_eq!(config.log_level, Some("info".to_string()));
        assert!(config.storage_path.is_none());
    }

    #[test]
    fn empty_has_all_none() {
        assert_eq!(AppConfig::empty(), AppConfig::default());
    }

    #[test]
    fn merge_other_takes_precedence() {
        let base = AppConfig::defaults();
        let other = AppConfig {
            bitrate: Some(128_000),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.bitrate, Some(128_000));
        assert_eq!(merged.timeslice_ms, Some(50)); // Kept from base
        assert_eq!(merged.log_level, Some("debug".to_string()));
    }

    #[test]
    fn merge_preserves_base_when_other_is_none() {
        let base = AppConfig {
            stop_grace_ms: Some(250),
            ..Default::default()
        };

        let merged = base.merge(AppConfig::empty());
        assert_eq!(merged.stop_grace_ms, Some(250));
    }

    #[test]
    fn accessors_fall_back_to_defaults() {
        let config = AppConfig::empty();
        assert_eq!(config.bitrate_or_default(), DEFAULT_BITRATE);
        assert_eq!(config.timeslice_or_default(), Duration::from_millis(50));
        assert_eq!(config.stop_grace_or_default(), Duration::from_secs(1));
        assert_eq!(config.log_level_or_default(), "info");
    }

    #[test]
    fn zero_timeslice_uses_default() {
        let config = AppConfig {
            timeslice_ms: Some(0),
            bitrate: Some(0),
            ..Default::default()
        };
        assert_eq!(config.timeslice_or_default(), Duration::from_millis(50));
        assert_eq!(config.bitrate_or_default(), DEFAULT_BITRATE);
    }

    #[test]
    fn storage_path_or_uses_configured() {
        let config = AppConfig {
            storage_path: Some("/tmp/store.json".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.storage_path_or(PathBuf::from("/default.json")),
            PathBuf::from("/tmp/store.json")
        );
        assert_eq!(
            AppConfig::empty().storage_path_or(PathBuf::from("/default.json")),
            PathBuf::from("/default.json")
        );
    }
}
