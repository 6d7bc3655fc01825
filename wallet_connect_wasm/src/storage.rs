// Storage picked at startup: localStorage when the browser allows it, memory otherwise

use async_trait::async_trait;
use log::warn;
use serde::{de::DeserializeOwned, Serialize};
use wallet_connect_core::storage_trait::{MemoryStorage, StorageBackend, StorageResult};
use wallet_connect_core::wasm::LocalStorageBackend;

pub enum AppStorage {
    Local(LocalStorageBackend),
    Memory(MemoryStorage),
}

impl AppStorage {
    pub fn detect(prefix: &str) -> Self {
        if LocalStorageBackend::is_available() {
            AppStorage::Local(LocalStorageBackend::new(prefix))
        } else {
            warn!("localStorage unavailable, the disconnect preference will not survive a reload");
            AppStorage::Memory(MemoryStorage::new())
        }
    }
}

#[async_trait(?Send)]
impl StorageBackend for AppStorage {
    async fn save<T: Serialize>(&self, key: &str, data: &T) -> StorageResult<()> {
        match self {
            AppStorage::Local(s) => s.save(key, data).await,
            AppStorage::Memory(s) => s.save(key, data).await,
        }
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self {
            AppStorage::Local(s) => s.load(key).await,
            AppStorage::Memory(s) => s.load(key).await,
        }
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        match self {
            AppStorage::Local(s) => s.remove(key).await,
            AppStorage::Memory(s) => s.remove(key).await,
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self {
            AppStorage::Local(s) => s.exists(key).await,
            AppStorage::Memory(s) => s.exists(key).await,
        }
    }

    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        match self {
            AppStorage::Local(s) => s.list_keys().await,
            AppStorage::Memory(s) => s.list_keys().await,
        }
    }
}
