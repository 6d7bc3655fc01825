// Storage abstraction - allows both file-based (native) and localStorage (WASM)

use crate::error::CoreError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, CoreError>;

/// Abstract storage backend trait
/// Native implementations can use files, WASM can use localStorage
#[async_trait(?Send)]
pub trait StorageBackend {
    /// Save data with a key
    async fn save<T: Serialize>(&self, key: &str, data: &T) -> StorageResult<()>;

    /// Load data by key
    async fn load<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>>;

    /// Remove data by key
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// List all keys (optional, may not be supported by all backends)
    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Standard storage keys used across the application
pub mod keys {
    /// Set when the user explicitly disconnected; suppresses silent auto-reconnect
    pub const WALLET_DISCONNECTED: &str = "wallet_disconnected";
}

/// In-memory backend. Used when no persistent storage is available
/// (e.g. localStorage blocked in a private window) and by tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait(?Send)]
impl StorageBackend for MemoryStorage {
    async fn save<T: Serialize>(&self, key: &str, data: &T) -> StorageResult<()> {
        let json = serde_json::to_string(data)?;
        self.entries.borrow_mut().insert(key.to_string(), json);
        Ok(())
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let json = self.entries.borrow().get(key).cloned();
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.entries.borrow().contains_key(key))
    }

    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.borrow().keys().cloned().collect())
    }
}
