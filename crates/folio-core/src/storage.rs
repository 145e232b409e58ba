//! Key-value persistence for session snapshots and durable preferences.
//!
//! Two scopes share one trait:
//! - session scope holds cache snapshots (`{data, fetchedAt}`) that may be
//!   discarded at any time
//! - durable scope holds preferences and note buckets
//!
//! Values are plain strings; JSON helpers treat malformed values as absent.
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_core::storage::{FileStore, KeyValueStore};
//!
//! let store = FileStore::new("/home/me/.local/share/folio/durable");
//! store.set("app.lang.v1", "pt").await?;
//! assert_eq!(store.get("app.lang.v1").await?.as_deref(), Some("pt"));
//! ```

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::logging::SUBSYSTEM_STORAGE;

/// String key-value store with last-write-wins semantics.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Read and decode a JSON value. Missing, unreadable or malformed entries
/// are reported as `None`.
pub async fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(subsystem = SUBSYSTEM_STORAGE, key, error = %e, "Storage read failed");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(subsystem = SUBSYSTEM_STORAGE, key, error = %e, "Discarding malformed stored value");
            None
        }
    }
}

/// Encode and store a JSON value.
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let serialized = serde_json::to_string(value)?;
    store.set(key, &serialized).await
}

/// In-process store. Contents live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Filesystem store: one file per key under a base directory.
///
/// Path format: `{base_path}/{hex(key)}.val`. Keys may contain any
/// characters (file names, `::` separators) so they are hex-encoded.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.val", hex::encode(key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.full_path(key);
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("read({:?}): {}", path, e))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let full_path = self.full_path(key);
        debug!(subsystem = SUBSYSTEM_STORAGE, key, size = value.len(), "file_store: write");

        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| Error::Storage(format!("create_dir_all({:?}): {}", self.base_path, e)))?;

        // Atomic write: temp file + rename. Each write gets its own temp file
        // so concurrent writers of one key never share it.
        let temp_path = full_path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Storage(format!("create({:?}): {}", temp_path, e)))?;
        file.write_all(value.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "file_store: rename failed");
            Error::Storage(format!("rename({:?}): {}", temp_path, e))
        })?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.full_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("remove({:?}): {}", path, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        data: Vec<i64>,
        #[serde(rename = "fetchedAt")]
        fetched_at: i64,
    }

    #[tokio::test]
    async fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let key = "analysis.notes.v1::report.pdf::120::-42";

        FileStore::new(dir.path()).set(key, "[]").await.unwrap();
        let reopened = FileStore::new(dir.path());
        assert_eq!(reopened.get(key).await.unwrap().as_deref(), Some("[]"));

        reopened.remove(key).await.unwrap();
        assert_eq!(reopened.get(key).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_file_store_concurrent_writes_to_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FileStore::new(dir.path()));
        let key = "cache.collections.v1";
        let large = format!("{{\"data\":\"{}\",\"fetchedAt\":1}}", "a".repeat(200_000));
        let small = format!("{{\"data\":\"{}\",\"fetchedAt\":2}}", "b".repeat(100_000));

        for _ in 0..50 {
            let (a, b) = tokio::join!(
                tokio::spawn({
                    let store = store.clone();
                    let value = large.clone();
                    async move { store.set(key, &value).await }
                }),
                tokio::spawn({
                    let store = store.clone();
                    let value = small.clone();
                    async move { store.set(key, &value).await }
                }),
            );
            a.unwrap().unwrap();
            b.unwrap().unwrap();

            let stored = store.get(key).await.unwrap().unwrap();
            assert!(stored == large || stored == small);
        }

        // No temp files are left behind.
        let mut entries = std::fs::read_dir(dir.path()).unwrap();
        assert!(entries.all(|e| {
            let name = e.unwrap().file_name();
            !name.to_string_lossy().ends_with(".tmp")
        }));
    }

    #[tokio::test]
    async fn test_file_store_missing_dir_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("not-created-yet"));
        assert_eq!(store.get("anything").await.unwrap(), None);
        store.remove("anything").await.unwrap();
    }

    #[tokio::test]
    async fn test_json_helpers_round_trip() {
        let store = MemoryStore::new();
        let snap = Snapshot {
            data: vec![1, 2],
            fetched_at: 99,
        };
        save_json(&store, "snap", &snap).await.unwrap();
        let loaded: Option<Snapshot> = load_json(&store, "snap").await;
        assert_eq!(loaded, Some(snap));
    }

    #[tokio::test]
    async fn test_load_json_malformed_is_none() {
        let store = MemoryStore::new();
        store.set("snap", "{not json").await.unwrap();
        let loaded: Option<Snapshot> = load_json(&store, "snap").await;
        assert_eq!(loaded, None);
    }
}
