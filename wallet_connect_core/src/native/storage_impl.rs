// Native file-based storage implementation

use crate::storage_trait::{StorageBackend, StorageResult};
use crate::error::CoreError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::path::PathBuf;
use log::debug;

/// File-based storage backend: one JSON file per key under `base_dir`
pub struct FileStorage {
    base_dir: PathBuf,
    prefix: String,
}

impl FileStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self::with_prefix(base_dir, "")
    }

    /// Same as [`FileStorage::new`], with `prefix` prepended to every file name
    pub fn with_prefix(base_dir: PathBuf, prefix: impl Into<String>) -> Self {
        Self {
            base_dir,
            prefix: prefix.into(),
        }
    }

    fn get_path(&self, key: &str) -> PathBuf {
        let name: String = format!("{}{}", self.prefix, key)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.base_dir.join(format!("{}.json", name))
    }
}

#[async_trait(?Send)]
impl StorageBackend for FileStorage {
    async fn save<T: Serialize>(&self, key: &str, data: &T) -> StorageResult<()> {
        let path = self.get_path(key);
        debug!("Saving {} to {:?}", key, path);

        tokio::fs::create_dir_all(&self.base_dir).await
            .map_err(|e| CoreError::Io(format!("Failed to create directory: {}", e)))?;

        let json = serde_json::to_string_pretty(data)?;
        tokio::fs::write(&path, json).await
            .map_err(|e| CoreError::Io(format!("Failed to write file: {}", e)))?;
        Ok(())
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let path = self.get_path(key);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored value for {}", key);
                return Ok(None);
            }
            Err(e) => return Err(CoreError::Io(format!("Failed to read file: {}", e))),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.get_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Io(format!("Failed to remove file: {}", e))),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.get_path(key);
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        if !tokio::fs::try_exists(&self.base_dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_dir).await
            .map_err(|e| CoreError::Io(format!("Failed to read directory: {}", e)))?;

        while let Some(entry) = entries.next_entry().await
            .map_err(|e| CoreError::Io(format!("Failed to read directory entry: {}", e)))? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix(self.prefix.as_str()))
            {
                keys.push(key.to_string());
            }
        }

        keys.sort();
        Ok(keys)
    }
}
