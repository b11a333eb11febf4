//! Writes finished takes into the output directory

use std::sync::Arc;

use chrono::{Local, Utc};
use tracing::{error, info};

use crate::domain::error::SessionError;
use crate::domain::format::{AudioFormat, OUTPUT_EXTENSION};
use crate::domain::recording::{AudioPayload, PersistedRecording, RecordingStatus};

use super::ports::DirectoryHandle;

/// What the writer needs to know about a take besides its bytes
#[derive(Debug, Clone, Copy)]
pub struct RecordingMetadata<'a> {
    pub format: &'a AudioFormat,
    pub duration_seconds: u64,
}

/// Persists one payload as `<N>.webm`
pub struct AudioFileWriter {
    directory: Option<Arc<dyn DirectoryHandle>>,
}

impl AudioFileWriter {
    pub fn new(directory: Option<Arc<dyn DirectoryHandle>>) -> Self {
        Self { directory }
    }

    /// File name for a take. The same for every format.
    pub fn filename(file_number: u64) -> String {
        format!("{}.{}", file_number, OUTPUT_EXTENSION)
    }

    /// Write the payload. Failures are reported as-is, never retried.
    pub async fn write(
        &self,
        payload: &AudioPayload,
        file_number: u64,
        metadata: RecordingMetadata<'_>,
    ) -> Result<PersistedRecording, SessionError> {
        let directory = self
            .directory
            .as_ref()
            .ok_or(SessionError::DirectoryUnavailable)?;
        let filename = Self::filename(file_number);

        if let Err(e) = directory.write_file(&filename, payload.data()).await {
            error!(filename = %filename, error = %e, "Audio file save failed");
            return Err(SessionError::WriteFailure(e.to_string()));
        }

        info!(
            filename = %filename,
            size = payload.size_bytes(),
            format = metadata.format.display_name,
            "Audio file saved"
        );

        Ok(PersistedRecording {
            id: Utc::now().timestamp_millis(),
            filename,
            file_number,
            duration_seconds: metadata.duration_seconds,
            captured_at_display: Local::now().format("%H:%M:%S").to_string(),
            size_bytes: payload.size_bytes(),
            format_name: metadata.format.display_name.to_string(),
            directory_name: directory.name().to_string(),
            status: RecordingStatus::ReadyForWatchdog,
        })
    }
}
