// WASM localStorage-based storage implementation

use crate::storage_trait::{StorageBackend, StorageResult};
use crate::error::CoreError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use web_sys::window;
use log::debug;

/// LocalStorage-based storage backend for WASM mode.
/// Values are stored as JSON, so the disconnect flag reads `"true"` in devtools.
pub struct LocalStorageBackend {
    prefix: String,
}

impl LocalStorageBackend {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Whether localStorage can be used at all (it throws in some private modes)
    pub fn is_available() -> bool {
        window()
            .and_then(|w| w.local_storage().ok().flatten())
            .is_some()
    }

    fn get_full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn get_storage(&self) -> StorageResult<web_sys::Storage> {
        window()
            .ok_or_else(|| CoreError::Init("No window object available".to_string()))?
            .local_storage()
            .map_err(|e| CoreError::Storage(format!("Failed to access localStorage: {:?}", e)))?
            .ok_or_else(|| CoreError::Storage("localStorage not available".to_string()))
    }
}

#[async_trait(?Send)]
impl StorageBackend for LocalStorageBackend {
    async fn save<T: Serialize>(&self, key: &str, data: &T) -> StorageResult<()> {
        let full_key = self.get_full_key(key);
        debug!("Saving {} to localStorage", full_key);

        let json = serde_json::to_string(data)?;
        self.get_storage()?
            .set_item(&full_key, &json)
            .map_err(|e| CoreError::Storage(format!("Failed to save to localStorage: {:?}", e)))
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let full_key = self.get_full_key(key);
        let json = self
            .get_storage()?
            .get_item(&full_key)
            .map_err(|e| CoreError::Storage(format!("Failed to read from localStorage: {:?}", e)))?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let full_key = self.get_full_key(key);
        debug!("Removing {} from localStorage", full_key);
        self.get_storage()?
            .remove_item(&full_key)
            .map_err(|e| CoreError::Storage(format!("Failed to remove from localStorage: {:?}", e)))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let full_key = self.get_full_key(key);
        let item = self
            .get_storage()?
            .get_item(&full_key)
            .map_err(|e| CoreError::Storage(format!("Failed to check localStorage: {:?}", e)))?;
        Ok(item.is_some())
    }

    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        let storage = self.get_storage()?;
        let length = storage
            .length()
            .map_err(|e| CoreError::Storage(format!("Failed to get localStorage length: {:?}", e)))?;

        let mut keys = Vec::new();
        for i in 0..length {
            if let Ok(Some(key)) = storage.key(i) {
                if let Some(stripped) = key.strip_prefix(self.prefix.as_str()) {
                    keys.push(stripped.to_string());
                }
            }
        }
        Ok(keys)
    }
}
