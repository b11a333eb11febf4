//! Persisted recording entity

use std::fmt;

use super::payload::human_readable_size;

/// Lifecycle status of a written take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingStatus {
    /// Written and waiting for the external watchdog to pick it up
    #[default]
    ReadyForWatchdog,
}

impl RecordingStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReadyForWatchdog => "ready-for-watchdog",
        }
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A take that was successfully written to the output directory.
/// Kept in memory for the lifetime of the session only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecording {
    pub id: i64,
    pub filename: String,
    pub file_number: u64,
    pub duration_seconds: u64,
    pub captured_at_display: String,
    pub size_bytes: usize,
    pub format_name: String,
    pub directory_name: String,
    pub status: RecordingStatus,
}

impl PersistedRecording {
    pub fn human_readable_size(&self) -> String {
        human_readable_size(self.size_bytes)
    }
}
