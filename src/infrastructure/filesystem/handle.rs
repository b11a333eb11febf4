//! Writable directory handle on the local filesystem

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::application::ports::{DirectoryHandle, FileSystemError};

/// A directory the user pointed us at
#[derive(Debug, Clone)]
pub struct FsDirectoryHandle {
    path: PathBuf,
    name: String,
}

impl FsDirectoryHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn target(&self, filename: &str) -> Result<PathBuf, FileSystemError> {
        let plain = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\']);
        if !plain {
            return Err(FileSystemError::InvalidName(filename.to_string()));
        }
        Ok(self.path.join(filename))
    }
}

#[async_trait]
impl DirectoryHandle for FsDirectoryHandle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write_file(&self, filename: &str, contents: &[u8]) -> Result<(), FileSystemError> {
        let target = self.target(filename)?;

        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Err(FileSystemError::HandleInvalid(self.path.display().to_string()));
        }

        let write_failed = |e: std::io::Error| match e.kind() {
            ErrorKind::NotFound => FileSystemError::HandleInvalid(self.path.display().to_string()),
            _ => FileSystemError::WriteFailed {
                filename: filename.to_string(),
                message: e.to_string(),
            },
        };

        let mut file = File::create(&target).await.map_err(write_failed)?;
        file.write_all(contents).await.map_err(write_failed)?;
        file.flush().await.map_err(write_failed)?;
        file.sync_all().await.map_err(write_failed)?;

        debug!(path = %target.display(), bytes = contents.len(), "File written");
        Ok(())
    }
}
