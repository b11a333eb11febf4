//! Microphone permission gate

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::error::SessionError;
use crate::domain::session::PermissionStatus;

use super::ports::{CaptureConstraints, CaptureDevice, CaptureStream};

/// Requests and tracks microphone authorization
pub struct PermissionGate<D: CaptureDevice> {
    device: Arc<D>,
    status: PermissionStatus,
}

impl<D: CaptureDevice> PermissionGate<D> {
    pub fn new(device: Arc<D>) -> Self {
        Self {
            device,
            status: PermissionStatus::Checking,
        }
    }

    /// Current status
    pub fn status(&self) -> PermissionStatus {
        self.status
    }

    /// Open the microphone with raw stereo constraints.
    ///
    /// The test stream only proves access and is released immediately.
    pub async fn ensure_microphone_access(&mut self) -> Result<(), SessionError> {
        self.status = PermissionStatus::Checking;

        match self.device.request_stream(&CaptureConstraints::raw()).await {
            Ok(stream) => {
                stream.stop_tracks();
                self.status = PermissionStatus::Granted;
                info!("Microphone access granted");
                Ok(())
            }
            Err(e) => {
                self.status = PermissionStatus::Denied;
                warn!(error = %e, "Microphone access denied");
                Err(SessionError::PermissionDenied(e.to_string()))
            }
        }
    }
}
