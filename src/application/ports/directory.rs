//! Directory access port interfaces

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Errors writing into a granted directory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileSystemError {
    #[error("Failed to write {filename}: {message}")]
    WriteFailed { filename: String, message: String },

    #[error("Directory is no longer accessible: {0}")]
    HandleInvalid(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),
}

/// Directory picker errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickerError {
    /// The user dismissed the picker; not a failure
    #[error("Directory selection cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),
}

/// A user-granted, writable directory
#[async_trait]
pub trait DirectoryHandle: Send + Sync {
    /// Display name of the directory
    fn name(&self) -> &str;

    /// Create or truncate `filename` and write `contents` in full.
    async fn write_file(&self, filename: &str, contents: &[u8]) -> Result<(), FileSystemError>;
}

/// Port for asking the user for a directory
#[async_trait]
pub trait DirectoryPicker: Send + Sync {
    /// Prompt for a writable directory.
    ///
    /// # Returns
    /// A handle, or [`PickerError::Cancelled`] if the user declined
    async fn pick_directory(&self) -> Result<Arc<dyn DirectoryHandle>, PickerError>;
}
