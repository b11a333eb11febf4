//! Durable storage of the directory configuration and the file counter

use std::sync::Arc;

use tracing::debug;

use crate::domain::directory::DirectoryConfig;

use super::ports::{KeyValueStore, StorageError};

/// Storage key for the directory configuration (JSON)
pub const DIRECTORY_CONFIG_KEY: &str = "audio-studio-directory-config";

/// Storage key for the file counter (decimal string)
pub const FILE_COUNTER_KEY: &str = "audio-studio-file-counter";

/// Typed access to the two persisted values, on top of a key-value store
pub struct ConfigStore {
    store: Arc<dyn KeyValueStore>,
}

impl ConfigStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the stored directory configuration, if any
    pub async fn load_directory_config(&self) -> Result<Option<DirectoryConfig>, StorageError> {
        let Some(raw) = self.store.get(DIRECTORY_CONFIG_KEY).await? else {
            return Ok(None);
        };

        DirectoryConfig::from_json(&raw)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: DIRECTORY_CONFIG_KEY.to_string(),
                message: e.to_string(),
            })
    }

    /// Save the directory configuration
    pub async fn save_directory_config(&self, config: &DirectoryConfig) -> Result<(), StorageError> {
        let json = config
            .to_json()
            .map_err(|e| StorageError::Write(e.to_string()))?;
        self.store.set(DIRECTORY_CONFIG_KEY, &json).await?;
        debug!(directory = ?config.directory_name, "Directory config saved");
        Ok(())
    }

    /// Remove the directory configuration
    pub async fn clear_directory_config(&self) -> Result<(), StorageError> {
        self.store.remove(DIRECTORY_CONFIG_KEY).await
    }

    /// Load the counter. Absent or non-positive values read as `None`.
    pub async fn load_counter(&self) -> Result<Option<u64>, StorageError> {
        let Some(raw) = self.store.get(FILE_COUNTER_KEY).await? else {
            return Ok(None);
        };

        match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => Ok(Some(value)),
            _ => {
                debug!(raw = %raw, "Ignoring unusable file counter value");
                Ok(None)
            }
        }
    }

    /// Save the counter
    pub async fn save_counter(&self, value: u64) -> Result<(), StorageError> {
        self.store.set(FILE_COUNTER_KEY, &value.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::platform::PlatformOs;
    use crate::infrastructure::storage::MemoryStore;

    fn store() -> (Arc<MemoryStore>, ConfigStore) {
        let memory = Arc::new(MemoryStore::new());
        let config = ConfigStore::new(memory.clone());
        (memory, config)
    }

    #[tokio::test]
    async fn directory_config_round_trips_through_json() {
        let (memory, store) = store();
        let config = DirectoryConfig::verified("takes", PlatformOs::Linux, 1000);

        store.save_directory_config(&config).await.unwrap();
        let raw = memory.get(DIRECTORY_CONFIG_KEY).await.unwrap().unwrap();
        assert!(raw.contains("\"version\":\"2.0\""));

        let loaded = store.load_directory_config().await.unwrap();
        assert_eq!(loaded, Some(config));
    }

    #[tokio::test]
    async fn missing_directory_config_is_none() {
        let (_, store) = store();
        assert_eq!(store.load_directory_config().await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_directory_config_is_reported() {
        let (memory, store) = store();
        memory.set(DIRECTORY_CONFIG_KEY, "{not json").await.unwrap();

        let err = store.load_directory_config().await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn clear_removes_directory_config() {
        let (_, store) = store();
        let config = DirectoryConfig::verified("takes", PlatformOs::Linux, 1000);
        store.save_directory_config(&config).await.unwrap();

        store.clear_directory_config().await.unwrap();
        assert_eq!(store.load_directory_config().await.unwrap(), None);
    }

    #[tokio::test]
    async fn counter_is_stored_as_decimal_string() {
        let (memory, store) = store();
        store.save_counter(42).await.unwrap();
        assert_eq!(memory.get(FILE_COUNTER_KEY).await.unwrap(), Some("42".to_string()));
        assert_eq!(store.load_counter().await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn unusable_counter_reads_as_none() {
        let (memory, store) = store();
        memory.set(FILE_COUNTER_KEY, "garbage").await.unwrap();
        assert_eq!(store.load_counter().await.unwrap(), None);

        memory.set(FILE_COUNTER_KEY, "0").await.unwrap();
        assert_eq!(store.load_counter().await.unwrap(), None);
    }
}
