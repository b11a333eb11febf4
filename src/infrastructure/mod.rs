//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces:
//! cpal capture, the local filesystem, JSON storage, TOML settings,
//! and the log file.

pub mod clock;
pub mod config;
pub mod console;
pub mod filesystem;
pub mod logging;
pub mod recording;
pub mod storage;

// Re-export adapters
pub use clock::SystemClock;
pub use config::XdgSettingsStore;
pub use console::PromptInput;
pub use filesystem::{FsDirectoryHandle, FsDirectoryPicker};
pub use logging::init_logging;
pub use recording::CpalCaptureDevice;
pub use storage::{JsonFileStore, MemoryStore};
