//! Domain error types

use thiserror::Error;

use crate::domain::session::InvalidStateTransition;

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),

    #[error("Invalid value for '{key}': {message}")]
    ValidationError { key: String, message: String },
}

/// Everything that can go wrong during a recording session.
///
/// Each variant's message is what ends up in the session's error slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Microphone access refused; retry through the permission gate
    #[error("Microphone required: {0}")]
    PermissionDenied(String),

    /// No candidate encoding is supported; nothing can be recorded
    #[error("No supported audio recording formats found")]
    NoSupportedFormat,

    /// No directory handle; run setup or restore first
    #[error("Working directory required - please setup directory first")]
    DirectoryUnavailable,

    /// The directory picker failed for a reason other than cancellation
    #[error("Directory access required for audio output: {0}")]
    DirectoryAccess(String),

    /// The capture stream or encoder could not be opened
    #[error("Failed to start: {0}")]
    StartFailed(String),

    /// The device failed mid-recording; the take is lost
    #[error("Recording failed: {0}")]
    CaptureRuntime(String),

    /// Stop was reached without a single chunk of audio
    #[error("No audio data captured")]
    NoAudioCaptured,

    /// The output file could not be written; the take is lost
    #[error("Failed to save audio: {0}")]
    WriteFailure(String),

    /// Persistent key-value storage failed
    #[error("Storage unavailable: {0}")]
    StorageFailure(String),

    #[error(transparent)]
    InvalidState(#[from] InvalidStateTransition),
}
