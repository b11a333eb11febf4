//! Application layer - Session services and port interfaces
//!
//! Contains the recording session controller, the services it drives,
//! and trait definitions for external system interactions.

pub mod config_store;
pub mod directory;
pub mod negotiator;
pub mod permission;
pub mod ports;
pub mod sequencer;
pub mod session;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

// Re-export services
pub use config_store::ConfigStore;
pub use directory::{DirectoryAccessManager, DirectoryOutcome};
pub use negotiator::FormatNegotiator;
pub use permission::PermissionGate;
pub use sequencer::FileSequencer;
pub use session::{ControllerSettings, RecordingSessionController, SessionSnapshot};
pub use writer::{AudioFileWriter, RecordingMetadata};
