//! Directory picker that asks for a path on the terminal

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tracing::{info, warn};

use crate::application::ports::{DirectoryHandle, DirectoryPicker, PickerError};
use crate::infrastructure::console::PromptInput;

use super::handle::FsDirectoryHandle;

const PROMPT: &str = "Output directory (empty line to cancel): ";

/// Expand a leading `~` to the home directory
pub fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Prompts for a directory path and checks it can be written to
pub struct FsDirectoryPicker {
    input: Arc<PromptInput>,
    show_prompt: bool,
}

impl FsDirectoryPicker {
    pub fn new(input: Arc<PromptInput>) -> Self {
        Self {
            input,
            show_prompt: true,
        }
    }

    /// Don't print the prompt (input is not a terminal)
    pub fn quiet(mut self) -> Self {
        self.show_prompt = false;
        self
    }

    async fn validate(path: PathBuf) -> Result<FsDirectoryHandle, PickerError> {
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| PickerError::Failed(format!("{}: {}", path.display(), e)))?;

        if !metadata.is_dir() {
            return Err(PickerError::Failed(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        if metadata.permissions().readonly() {
            return Err(PickerError::Failed(format!(
                "{} is not writable",
                path.display()
            )));
        }

        Ok(FsDirectoryHandle::new(path))
    }
}

#[async_trait]
impl DirectoryPicker for FsDirectoryPicker {
    async fn pick_directory(&self) -> Result<Arc<dyn DirectoryHandle>, PickerError> {
        if self.show_prompt {
            eprint!("{}", PROMPT);
            let _ = std::io::stderr().flush();
        }

        let line = self
            .input
            .read_line()
            .await
            .map_err(|e| PickerError::Failed(e.to_string()))?;

        let raw = match line.as_deref().map(str::trim) {
            None | Some("") => {
                info!("Directory selection cancelled");
                return Err(PickerError::Cancelled);
            }
            Some(raw) => raw.to_string(),
        };

        match Self::validate(expand_home(&raw)).await {
            Ok(handle) => {
                info!(path = %handle.path().display(), "Directory selected");
                Ok(Arc::new(handle))
            }
            Err(e) => {
                warn!(path = %raw, error = %e, "Directory rejected");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn picker(input: &str) -> FsDirectoryPicker {
        let reader = Cursor::new(input.as_bytes().to_vec());
        FsDirectoryPicker::new(Arc::new(PromptInput::from_reader(reader))).quiet()
    }

    #[tokio::test]
    async fn empty_line_cancels() {
        let err = picker("\n").pick_directory().await.err().unwrap();
        assert_eq!(err, PickerError::Cancelled);
    }

    #[tokio::test]
    async fn end_of_input_cancels() {
        let err = picker("").pick_directory().await.err().unwrap();
        assert_eq!(err, PickerError::Cancelled);
    }

    #[tokio::test]
    async fn existing_directory_is_granted() {
        let dir = tempdir().unwrap();
        let handle = picker(&format!("  {}  \n", dir.path().display()))
            .pick_directory()
            .await
            .unwrap();

        let expected = dir.path().file_name().unwrap().to_string_lossy();
        assert_eq!(handle.name(), expected);
        handle.write_file("check.txt", b"ok").await.unwrap();
        assert!(dir.path().join("check.txt").exists());
    }

    #[tokio::test]
    async fn missing_path_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = picker(&format!("{}\n", missing.display()))
            .pick_directory()
            .await
            .err().unwrap();
        assert!(matches!(err, PickerError::Failed(_)));
    }

    #[tokio::test]
    async fn file_is_not_a_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("1.wav");
        std::fs::write(&file, b"x").unwrap();
        let err = picker(&format!("{}\n", file.display()))
            .pick_directory()
            .await
            .err().unwrap();
        assert!(matches!(err, PickerError::Failed(m) if m.contains("not a directory")));
    }

    #[test]
    fn expands_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~"), home);
            assert_eq!(expand_home("~/takes"), home.join("takes"));
        }
        assert_eq!(expand_home("/srv/takes"), PathBuf::from("/srv/takes"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
    }
}
