//! Recording domain module

mod payload;
mod persisted;

pub use payload::{human_readable_size, AudioPayload};
pub use persisted::{PersistedRecording, RecordingStatus};
