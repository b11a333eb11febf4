//! Recording session state machine

use std::fmt;
use thiserror::Error;

/// Recording session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AcquiringPermission,
    Recording,
    Stopping,
}

impl SessionState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AcquiringPermission => "acquiring permission",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid state transition: cannot {action} while {current_state}")]
pub struct InvalidStateTransition {
    pub current_state: SessionState,
    pub action: String,
}

/// Recording session entity.
///
/// State machine:
///   IDLE -> ACQUIRING_PERMISSION (acquire_permission)
///   IDLE | ACQUIRING_PERMISSION -> RECORDING (start_recording)
///   ACQUIRING_PERMISSION -> IDLE (abort_start)
///   RECORDING -> STOPPING (stop_recording)
///   STOPPING -> IDLE (complete_stop)
///   any -> IDLE (reset, forced teardown)
#[derive(Debug, Default)]
pub struct RecordingSession {
    state: SessionState,
    elapsed_seconds: u64,
}

impl RecordingSession {
    /// Create a new session in idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Seconds elapsed since recording started
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// Check if currently idle
    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    /// Check if currently stopping
    pub fn is_stopping(&self) -> bool {
        self.state == SessionState::Stopping
    }

    fn invalid(&self, action: &str) -> InvalidStateTransition {
        InvalidStateTransition {
            current_state: self.state,
            action: action.to_string(),
        }
    }

    /// Transition from IDLE to ACQUIRING_PERMISSION
    pub fn acquire_permission(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Idle {
            return Err(self.invalid("acquire permission"));
        }
        self.state = SessionState::AcquiringPermission;
        Ok(())
    }

    /// Transition from ACQUIRING_PERMISSION back to IDLE
    pub fn abort_start(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::AcquiringPermission {
            return Err(self.invalid("abort start"));
        }
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Transition from IDLE or ACQUIRING_PERMISSION to RECORDING
    pub fn start_recording(&mut self) -> Result<(), InvalidStateTransition> {
        if !matches!(
            self.state,
            SessionState::Idle | SessionState::AcquiringPermission
        ) {
            return Err(self.invalid("start recording"));
        }
        self.state = SessionState::Recording;
        self.elapsed_seconds = 0;
        Ok(())
    }

    /// Advance the elapsed counter by one second.
    /// Returns false (and does nothing) outside RECORDING.
    pub fn tick(&mut self) -> bool {
        if self.state != SessionState::Recording {
            return false;
        }
        self.elapsed_seconds += 1;
        true
    }

    /// Transition from RECORDING to STOPPING
    pub fn stop_recording(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Recording {
            return Err(self.invalid("stop recording"));
        }
        self.state = SessionState::Stopping;
        Ok(())
    }

    /// Transition from STOPPING to IDLE
    pub fn complete_stop(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Stopping {
            return Err(self.invalid("complete stop"));
        }
        self.reset();
        Ok(())
    }

    /// Force the session back to IDLE from any state
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.elapsed_seconds = 0;
    }
}
