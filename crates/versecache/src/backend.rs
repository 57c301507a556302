//! Storage backends a [`crate::CacheStore`] can sit on
//!
//! A backend moves opaque serialized entries; it knows nothing about expiry
//! or schema versions. Backends that can answer reads without suspending
//! also implement [`BlockingBackend`], which unlocks
//! [`crate::CacheStore::get_blocking`].

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

use ahash::RandomState;
use async_trait::async_trait;
use parking_lot::RwLock;
use versedb::{Error, LogStore, PrefsFile, Result};

/// Raw string key-value substrate
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Raw entry stored under `key`
    async fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the raw entry under `key`
    async fn write(&self, key: &str, raw: String) -> Result<()>;

    /// Delete `key`; absent keys are not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Every stored key
    async fn keys(&self) -> Result<Vec<String>>;

    /// Delete every key
    async fn clear(&self) -> Result<()>;
}

/// Backend that can also serve reads on the calling thread
pub trait BlockingBackend: Backend {
    /// Raw entry stored under `key`, without suspending
    fn read_blocking(&self, key: &str) -> Result<Option<String>>;

    /// Delete `key`, without suspending
    fn delete_blocking(&self, key: &str) -> Result<()>;
}

async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))?
}

/// Small-value tier over a [`PrefsFile`]
///
/// Reads come straight from memory; writes rewrite the snapshot on the
/// blocking pool.
#[derive(Clone)]
pub struct PrefsBackend {
    prefs: Arc<PrefsFile>,
}

impl PrefsBackend {
    /// Open the prefs engine in `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Ok(Self::new(Arc::new(PrefsFile::open(dir)?)))
    }

    /// Wrap an already open engine
    pub fn new(prefs: Arc<PrefsFile>) -> Self {
        Self { prefs }
    }
}

#[async_trait]
impl Backend for PrefsBackend {
    fn name(&self) -> &'static str {
        "small"
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.prefs.get(key))
    }

    async fn write(&self, key: &str, raw: String) -> Result<()> {
        let prefs = Arc::clone(&self.prefs);
        let key = key.to_string();
        run_blocking(move || prefs.put(&key, &raw)).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let prefs = Arc::clone(&self.prefs);
        let key = key.to_string();
        run_blocking(move || prefs.delete(&key).map(|_| ())).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.prefs.keys())
    }

    async fn clear(&self) -> Result<()> {
        let prefs = Arc::clone(&self.prefs);
        run_blocking(move || prefs.clear()).await
    }
}

impl BlockingBackend for PrefsBackend {
    fn read_blocking(&self, key: &str) -> Result<Option<String>> {
        Ok(self.prefs.get(key))
    }

    fn delete_blocking(&self, key: &str) -> Result<()> {
        self.prefs.delete(key).map(|_| ())
    }
}

/// Large-value tier over a [`LogStore`]; async only
#[derive(Clone)]
pub struct LogBackend {
    store: Arc<LogStore>,
}

impl LogBackend {
    /// Open the log engine in `dir` with a read cache of `read_cache_bytes`
    pub fn open<P: AsRef<Path>>(dir: P, read_cache_bytes: usize) -> Result<Self> {
        Ok(Self::new(Arc::new(LogStore::open_with_cache(
            dir,
            read_cache_bytes,
        )?)))
    }

    /// Wrap an already open engine
    pub fn new(store: Arc<LogStore>) -> Self {
        Self { store }
    }

    /// The underlying engine, for maintenance such as compaction
    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }
}

#[async_trait]
impl Backend for LogBackend {
    fn name(&self) -> &'static str {
        "large"
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        let store = Arc::clone(&self.store);
        let key = key.to_string();
        let bytes = run_blocking(move || store.get(&key)).await?;
        bytes
            .map(|bytes| {
                String::from_utf8(bytes).map_err(|_| Error::Parse("value is not UTF-8".to_string()))
            })
            .transpose()
    }

    async fn write(&self, key: &str, raw: String) -> Result<()> {
        let store = Arc::clone(&self.store);
        let key = key.to_string();
        run_blocking(move || store.put(&key, raw.as_bytes())).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let store = Arc::clone(&self.store);
        let key = key.to_string();
        run_blocking(move || store.delete(&key).map(|_| ())).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let store = Arc::clone(&self.store);
        run_blocking(move || store.keys()).await
    }

    async fn clear(&self) -> Result<()> {
        let store = Arc::clone(&self.store);
        run_blocking(move || store.clear()).await
    }
}

/// In-process backend with no persistence
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, String, RandomState>>>,
}

impl MemoryBackend {
    /// Empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        self.read_blocking(key)
    }

    async fn write(&self, key: &str, raw: String) -> Result<()> {
        self.entries.write().insert(key.to_string(), raw);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.delete_blocking(key)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }
}

impl BlockingBackend for MemoryBackend {
    fn read_blocking(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn delete_blocking(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
