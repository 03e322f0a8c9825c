// Storage abstraction - allows file-based (native), localStorage (WASM) and no-op backends

use crate::error::CoreError;
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::HashMap;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, CoreError>;

/// Abstract string key-value store.
/// The connector persists exactly one value: the last connected wallet name.
#[async_trait(?Send)]
pub trait KeyValueStore {
    /// Read a value by key; `None` when the key was never written.
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value under a key, replacing any previous value.
    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn remove_item(&self, key: &str) -> StorageResult<()>;
}

/// Storage keys used by the connector
pub mod keys {
    pub const LAST_WALLET: &str = "last_wallet";
}

/// Store that persists nothing. Default for hosts without a persistent
/// key-value capability, e.g. server-side rendering.
pub struct NoopStore;

#[async_trait(?Send)]
impl KeyValueStore for NoopStore {
    async fn get_item(&self, _key: &str) -> StorageResult<Option<String>> {
        Ok(None)
    }

    async fn set_item(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn remove_item(&self, _key: &str) -> StorageResult<()> {
        Ok(())
    }
}

/// In-memory store for tests and embedded hosts.
pub struct MemoryStore {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            items: RefCell::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get_item(keys::LAST_WALLET).await.unwrap(), None);

        store.set_item(keys::LAST_WALLET, "Phantom").await.unwrap();
        assert_eq!(
            store.get_item(keys::LAST_WALLET).await.unwrap(),
            Some("Phantom".to_string())
        );

        store.set_item(keys::LAST_WALLET, "Solflare").await.unwrap();
        assert_eq!(
            store.get_item(keys::LAST_WALLET).await.unwrap(),
            Some("Solflare".to_string())
        );

        store.remove_item(keys::LAST_WALLET).await.unwrap();
        assert_eq!(store.get_item(keys::LAST_WALLET).await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_remove_absent_key_is_ok() {
        let store = MemoryStore::new();
        store.remove_item("never_written").await.unwrap();
    }

    #[tokio::test]
    async fn noop_store_reads_back_nothing() {
        let store = NoopStore;
        store.set_item("k", "v").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap(), None);
        store.remove_item("k").await.unwrap();
    }
}
