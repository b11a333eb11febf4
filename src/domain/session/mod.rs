//! Recording session domain module

mod permission;
mod state;

pub use permission::PermissionStatus;
pub use state::{InvalidStateTransition, RecordingSession, SessionState};
