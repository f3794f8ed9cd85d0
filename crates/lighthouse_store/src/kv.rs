//! Local key-value stores backing the persistence gateway.
//!
//! Values are opaque strings (JSON in practice). `FileStore` keeps one
//! file per key; `MemoryStore` is for tests and ephemeral runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::{Error, Result};
use tokio::sync::{Mutex, RwLock};

/// String key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

// ── File-backed store ─────────────────────────────────────────────────

/// One `<key>.json` file per key under a directory.
///
/// Writes go through a store-wide lock, so overlapping writes to one key
/// land in the order they acquired it.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
    tmp_seq: Arc<AtomicU64>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Arc::new(Mutex::new(())),
            tmp_seq: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::Storage(format!("invalid storage key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// Temp path unique per write, also across processes sharing `dir`.
    fn tmp_path_for(&self, key: &str) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!("{key}.json.{}-{seq}.tmp", std::process::id()))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = self.tmp_path_for(key);

        let _guard = self.write_lock.lock().await;
        if let Err(e) = tokio::fs::write(&tmp, value).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ── In-memory store ───────────────────────────────────────────────────

/// Shared in-memory map; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_set_get_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path().join("kv")).await.expect("open");

        assert_eq!(store.get("forecast_1").await.expect("get"), None);

        store.set("forecast_1", r#"{"a":1}"#).await.expect("set");
        store.set("forecast_1", r#"{"a":2}"#).await.expect("overwrite");
        assert_eq!(
            store.get("forecast_1").await.expect("get").as_deref(),
            Some(r#"{"a":2}"#)
        );
        assert_eq!(std::fs::read_dir(store.dir()).expect("read_dir").count(), 1);

        store.remove("forecast_1").await.expect("remove");
        store.remove("forecast_1").await.expect("remove twice");
        assert_eq!(store.get("forecast_1").await.expect("get"), None);
    }

    #[tokio::test]
    async fn test_file_store_overlapping_sets_on_one_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).await.expect("open");
        let large = format!("\"{}\"", "x".repeat(200 * 1024));

        for _ in 0..200 {
            let (a, b) = tokio::join!(
                store.set("forecast_1", &large),
                store.set("forecast_1", "{}"),
            );
            a.expect("large write");
            b.expect("small write");
            assert_eq!(store.get("forecast_1").await.expect("get").as_deref(), Some("{}"));
        }

        let clone = store.clone();
        let (a, b) = tokio::join!(store.set("windAlerts", "{}"), clone.set("windAlerts", "[]"));
        a.expect("first");
        b.expect("second");
        assert_eq!(store.get("windAlerts").await.expect("get").as_deref(), Some("[]"));

        // Only the two value files remain; no temp files are left behind.
        assert_eq!(std::fs::read_dir(store.dir()).expect("read_dir").count(), 2);
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).await.expect("open");

        assert!(store.set("../escape", "x").await.is_err());
        assert!(store.get("").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_data() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set("userLanguage", "no").await.expect("set");
        assert_eq!(other.get("userLanguage").await.expect("get").as_deref(), Some("no"));
        assert_eq!(other.len().await, 1);

        other.remove("userLanguage").await.expect("remove");
        assert!(store.is_empty().await);
    }
}
