//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod clock;
pub mod directory;
pub mod settings;
pub mod storage;

// Re-export common types
pub use capture::{
    AudioEncoder, CaptureConstraints, CaptureDevice, CaptureError, CaptureStream, EncoderEvent,
    EncoderEventSender,
};
pub use clock::Clock;
pub use directory::{DirectoryHandle, DirectoryPicker, FileSystemError, PickerError};
pub use settings::SettingsStore;
pub use storage::{KeyValueStore, StorageError};
