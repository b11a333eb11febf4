//! Directory configuration entity

use serde::{Deserialize, Serialize};

use crate::domain::platform::PlatformOs;

/// Schema version written with every saved configuration
pub const SCHEMA_VERSION: &str = "2.0";

/// How long a verified directory configuration stays usable (7 days)
pub const MAX_CONFIG_AGE_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Persisted record of the last directory the user granted.
///
/// The directory handle itself is never stored; this only remembers that a
/// directory was configured, so the user can be asked to re-grant it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryConfig {
    #[serde(default)]
    pub is_configured: bool,
    #[serde(default)]
    pub directory_name: Option<String>,
    #[serde(default)]
    pub last_verified: Option<i64>,
    #[serde(rename = "platformOS", default)]
    pub platform_os: PlatformOs,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl DirectoryConfig {
    /// Create a configuration for a freshly granted directory
    pub fn verified(directory_name: impl Into<String>, platform_os: PlatformOs, now_ms: i64) -> Self {
        Self {
            is_configured: true,
            directory_name: Some(directory_name.into()),
            last_verified: Some(now_ms),
            platform_os,
            version: default_version(),
        }
    }

    /// The "nothing configured" state
    pub fn unconfigured() -> Self {
        Self {
            is_configured: false,
            directory_name: None,
            last_verified: None,
            platform_os: PlatformOs::Unknown,
            version: default_version(),
        }
    }

    /// Whether the configuration can still be used.
    ///
    /// Usable only when verified less than [`MAX_CONFIG_AGE_MS`] ago and
    /// created on the same platform.
    pub fn is_usable(&self, now_ms: i64, current: PlatformOs) -> bool {
        let Some(last_verified) = self.last_verified else {
            return false;
        };
        self.is_configured
            && now_ms - last_verified < MAX_CONFIG_AGE_MS
            && self.platform_os == current
    }

    /// Parse from the stored JSON form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to the stored JSON form
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self::unconfigured()
    }
}
