//! JSON file store
//!
//! Persists every key in one JSON object on disk. Writes go through a
//! temporary file and a rename so a crash never leaves a half-written store.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::store::{Store, StoreError};

/// [`Store`] backed by a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored key. Missing file reads as empty; a corrupt file is
    /// logged and read as empty.
    pub async fn load_all(&self) -> Result<Map<String, Value>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                log::warn!("{} is not a JSON object, treating as empty", self.path.display());
                Ok(Map::new())
            }
        }
    }

    async fn write_all(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        let unavailable = |what: &str, e: std::io::Error| {
            StoreError::Unavailable(format!("failed to {what} {}: {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| unavailable("create directory for", e))?;
        }

        let content = serde_json::to_string_pretty(map)
            .map_err(|e| StoreError::Unavailable(format!("failed to serialize store: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| unavailable("write", e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| unavailable("replace", e))
    }
}

impl Store for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.load_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load_all().await?;
        map.insert(key.to_string(), value);
        self.write_all(&map).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::keys;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("fokus.json"));
        assert_eq!(store.get(keys::BLOCKED_HOSTS).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fokus.json");

        let store = JsonFileStore::new(&path);
        store.set(keys::BLOCKED_HOSTS, json!(["reddit.com"])).await.unwrap();
        store.set(keys::BLOCKING_ENABLED, json!(true)).await.unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get(keys::BLOCKED_HOSTS).await.unwrap(), Some(json!(["reddit.com"])));
        assert_eq!(reopened.get(keys::BLOCKING_ENABLED).await.unwrap(), Some(json!(true)));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fokus.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get(keys::BLOCKING_ENABLED).await.unwrap(), None);

        store.set(keys::BLOCKING_ENABLED, json!(false)).await.unwrap();
        assert_eq!(store.get(keys::BLOCKING_ENABLED).await.unwrap(), Some(json!(false)));
    }
}
