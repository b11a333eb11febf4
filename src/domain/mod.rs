//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on external systems.

pub mod config;
pub mod directory;
pub mod error;
pub mod format;
pub mod platform;
pub mod recording;
pub mod session;

// Re-export common types
pub use config::AppConfig;
pub use directory::DirectoryConfig;
pub use error::*;
pub use format::{AudioFormat, Container};
pub use platform::PlatformOs;
pub use recording::{AudioPayload, PersistedRecording, RecordingStatus};
pub use session::{InvalidStateTransition, PermissionStatus, RecordingSession, SessionState};
