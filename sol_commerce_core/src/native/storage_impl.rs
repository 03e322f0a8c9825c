// Native file-based key/value store

use crate::error::CoreError;
use crate::storage::{KeyValueStore, StorageResult};
use async_trait::async_trait;
use log::debug;
use std::path::PathBuf;

/// File-backed store for native hosts; one file per key under a base
/// directory. Fills the persistence slot in server-side tools and tests where
/// no browser storage exists.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a file store rooted at the specified base directory
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the full path for a storage key
    fn item_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.txt", key))
    }
}

#[async_trait(?Send)]
impl KeyValueStore for FileStore {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.item_path(key);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("No stored value at {:?}", path);
            return Ok(None);
        }
        let value = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| CoreError::Io(format!("Failed to read file: {}", e)))?;
        Ok(Some(value))
    }

    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.item_path(key);
        debug!("Writing value to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::Io(format!("Failed to create directory: {}", e)))?;
        }

        tokio::fs::write(&path, value)
            .await
            .map_err(|e| CoreError::Io(format!("Failed to write file: {}", e)))?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        let path = self.item_path(key);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| CoreError::Io(format!("Failed to remove file: {}", e)))?;
            debug!("Removed stored value at {:?}", path);
        } else {
            debug!("Nothing stored at {:?}, nothing to remove", path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::keys;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf());

        store.set_item(keys::LAST_WALLET, "Phantom").await.unwrap();
        let value = store.get_item(keys::LAST_WALLET).await.unwrap();
        assert_eq!(value, Some("Phantom".to_string()));
    }

    #[tokio::test]
    async fn test_file_store_missing_key_reads_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf());

        let value = store.get_item("absent").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_file_store_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf());

        store.set_item(keys::LAST_WALLET, "Phantom").await.unwrap();
        store.remove_item(keys::LAST_WALLET).await.unwrap();
        assert_eq!(store.get_item(keys::LAST_WALLET).await.unwrap(), None);

        // Removing again is not an error
        store.remove_item(keys::LAST_WALLET).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_survives_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf());
        store.set_item(keys::LAST_WALLET, "Solflare").await.unwrap();

        let reopened = FileStore::new(temp_dir.path().to_path_buf());
        let value = reopened.get_item(keys::LAST_WALLET).await.unwrap();
        assert_eq!(value, Some("Solflare".to_string()));
    }
}
