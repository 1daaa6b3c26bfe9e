// Key-value substrate: the only thing the typed stores talk to.
//
// KeyValueStore mirrors a browser-extension style storage area: `get` takes a
// batch of keys and returns only the ones present, `set` merges a batch.
// MemoryStore backs tests and ephemeral runs; JsonFileStore backs the CLI.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use watchfeed_common::WatchfeedError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the given keys. Absent keys are omitted from the result.
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>>;

    /// Merge the given entries into the store, replacing existing values.
    async fn set(&self, entries: HashMap<String, Value>) -> Result<()>;
}

/// Read one key and deserialize it. `Ok(None)` when the key is absent.
pub async fn read_json<T: DeserializeOwned>(kv: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    let mut found = kv.get(&[key]).await?;
    match found.remove(key) {
        Some(value) => {
            let parsed = serde_json::from_value(value)
                .map_err(WatchfeedError::from)
                .with_context(|| format!("decoding store key {key}"))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Serialize and write one key.
pub async fn write_json<T: Serialize + ?Sized>(kv: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let encoded = serde_json::to_value(value)
        .map_err(WatchfeedError::from)
        .with_context(|| format!("encoding store key {key}"))?;
    kv.set(HashMap::from([(key.to_string(), encoded)])).await
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, new_entries: HashMap<String, Value>) -> Result<()> {
        self.entries.write().await.extend(new_entries);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Whole-store JSON document on disk. Each `set` rewrites the file through a
/// temp file + rename so a crash never leaves a half-written document.
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

    async fn load(&self) -> Result<HashMap<String, Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(WatchfeedError::from)
                .with_context(|| format!("parsing store file {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(WatchfeedError::Store(e.to_string()))
                .with_context(|| format!("reading store file {}", self.path.display())),
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let mut all = self.load().await?;
        Ok(keys
            .iter()
            .filter_map(|k| all.remove(*k).map(|v| (k.to_string(), v)))
            .collect())
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.load().await?;
        let count = entries.len();
        all.extend(entries);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let encoded = serde_json::to_vec_pretty(&all).map_err(WatchfeedError::from)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, encoded)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;

        debug!(path = %self.path.display(), keys = count, "Store file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_get_omits_absent_keys() {
        let store = MemoryStore::new();
        store
            .set(HashMap::from([("a".to_string(), json!(1))]))
            .await
            .unwrap();

        let found = store.get(&["a", "b"]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["a"], json!(1));
    }

    #[tokio::test]
    async fn memory_set_replaces_existing_value() {
        let store = MemoryStore::new();
        write_json(&store, "k", &vec![1, 2]).await.unwrap();
        write_json(&store, "k", &vec![3]).await.unwrap();

        let value: Option<Vec<i32>> = read_json(&store, "k").await.unwrap();
        assert_eq!(value, Some(vec![3]));
    }

    #[tokio::test]
    async fn read_json_absent_is_none() {
        let store = MemoryStore::new();
        let value: Option<String> = read_json(&store, "missing").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn read_json_wrong_shape_is_an_error() {
        let store = MemoryStore::new();
        write_json(&store, "k", "not a list").await.unwrap();
        let result: Result<Option<Vec<i32>>> = read_json(&store, "k").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let first = JsonFileStore::new(&path);
        write_json(&first, "feed.items", &vec!["x"]).await.unwrap();
        write_json(&first, "other", &true).await.unwrap();

        let second = JsonFileStore::new(&path);
        let items: Option<Vec<String>> = read_json(&second, "feed.items").await.unwrap();
        assert_eq!(items, Some(vec!["x".to_string()]));
        let other: Option<bool> = read_json(&second, "other").await.unwrap();
        assert_eq!(other, Some(true));
    }

    #[tokio::test]
    async fn file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.get(&["anything"]).await.unwrap().is_empty());
    }
}
