//! File number sequencing

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::config_store::{ConfigStore, FILE_COUNTER_KEY};
use super::ports::{Clock, StorageError};

/// Number issued when no counter has been stored yet
pub const FIRST_FILE_NUMBER: u64 = 1;

/// Issues unique, persisted, increasing file numbers.
///
/// The read-increment-write runs under a mutex, so concurrent callers in
/// this process never receive the same number.
pub struct FileSequencer {
    config: Arc<ConfigStore>,
    clock: Arc<dyn Clock>,
    /// Last fallback number handed out, so fallbacks stay unique
    last_fallback: Mutex<u64>,
}

impl FileSequencer {
    pub fn new(config: Arc<ConfigStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            last_fallback: Mutex::new(0),
        }
    }

    /// Issue the next file number.
    ///
    /// If storage fails, a timestamp-derived number is returned instead and
    /// the stored counter is left as it was.
    pub async fn next(&self) -> u64 {
        let mut last_fallback = self.last_fallback.lock().await;

        match self.advance().await {
            Ok(number) => {
                debug!(current = number, "File counter advanced");
                number
            }
            Err(e) => {
                let now = u64::try_from(self.clock.now_ms()).unwrap_or(0);
                let fallback = now.max(last_fallback.saturating_add(1));
                *last_fallback = fallback;
                warn!(error = %e, fallback, "Counter storage failed, using fallback number");
                fallback
            }
        }
    }

    async fn advance(&self) -> Result<u64, StorageError> {
        let current = self
            .config
            .load_counter()
            .await?
            .unwrap_or(FIRST_FILE_NUMBER);
        let next = current.checked_add(1).ok_or_else(|| StorageError::Corrupt {
            key: FILE_COUNTER_KEY.to_string(),
            message: format!("counter {} cannot be advanced", current),
        })?;
        self.config.save_counter(next).await?;
        Ok(current)
    }

    /// The number the next call to [`next`](Self::next) will issue
    pub async fn peek(&self) -> Result<u64, StorageError> {
        let _guard = self.last_fallback.lock().await;
        Ok(self
            .config
            .load_counter()
            .await?
            .unwrap_or(FIRST_FILE_NUMBER))
    }

    /// Restart numbering at 1
    pub async fn reset(&self) -> Result<(), StorageError> {
        let _guard = self.last_fallback.lock().await;
        self.config.save_counter(FIRST_FILE_NUMBER).await?;
        info!("File counter reset to {}", FIRST_FILE_NUMBER);
        Ok(())
    }
}
