// WASM localStorage-based key/value store

use crate::error::CoreError;
use crate::storage::{KeyValueStore, StorageResult};
use async_trait::async_trait;
use log::debug;
use web_sys::window;

/// localStorage-backed store for browser mode
pub struct LocalStorageStore {
    prefix: String,
}

impl LocalStorageStore {
    /// Create a localStorage store with the specified key prefix
    pub fn new(prefix: String) -> Self {
        Self { prefix }
    }

    /// Get the full key with prefix
    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Get localStorage instance
    fn storage(&self) -> StorageResult<web_sys::Storage> {
        window()
            .ok_or_else(|| CoreError::Init("No window object available".to_string()))?
            .local_storage()
            .map_err(|e| CoreError::Storage(format!("Failed to access localStorage: {:?}", e)))?
            .ok_or_else(|| CoreError::Init("localStorage not available".to_string()))
    }
}

#[async_trait(?Send)]
impl KeyValueStore for LocalStorageStore {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let full_key = self.full_key(key);
        let storage = self.storage()?;

        let value = storage.get_item(&full_key).map_err(|e| {
            CoreError::Storage(format!("Failed to read from localStorage: {:?}", e))
        })?;

        if value.is_none() {
            debug!("Key does not exist in localStorage: {}", full_key);
        }
        Ok(value)
    }

    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let full_key = self.full_key(key);
        debug!("Saving to localStorage: {}", full_key);

        let storage = self.storage()?;
        storage
            .set_item(&full_key, value)
            .map_err(|e| CoreError::Storage(format!("Failed to save to localStorage: {:?}", e)))?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        let full_key = self.full_key(key);
        debug!("Removing from localStorage: {}", full_key);

        let storage = self.storage()?;
        storage.remove_item(&full_key).map_err(|e| {
            CoreError::Storage(format!("Failed to remove from localStorage: {:?}", e))
        })?;
        Ok(())
    }
}
