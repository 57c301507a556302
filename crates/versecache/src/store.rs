//! CacheStore: TTL and schema-versioned values over any [`Backend`]
//!
//! The store is an optimization layer, never a system of record: storage and
//! serialization failures are logged and swallowed, and every kind of bad
//! entry (expired, stale schema, malformed) collapses into a miss after the
//! entry is deleted.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::backend::{Backend, BlockingBackend};
use crate::clock::{Clock, SystemClock};
use crate::entry::{self, CacheEntry, Validity};
use crate::stats::CacheStats;

/// Outcome of a [`CacheStore::purge_expired`] sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    /// Entries deleted as expired, stale or malformed
    pub removed: usize,
    /// Entries left in place
    pub kept: usize,
}

/// Raw view of a stored entry, as returned by [`CacheStore::inspect`]
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    /// Serialized entry exactly as stored
    pub raw: String,
    /// Validity at the time of inspection
    pub validity: Validity,
    /// Deadline in epoch ms, if the entry parsed and carries one
    pub expires_at: Option<i64>,
    /// Schema tag, if the entry parsed
    pub version: Option<String>,
}

enum Lookup<T> {
    Hit(T),
    Miss,
    Invalid,
}

/// Versioned, TTL-aware key-value cache over one storage tier
pub struct CacheStore<B> {
    backend: B,
    schema_version: String,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl<B: Backend> CacheStore<B> {
    /// Create a store on `backend` stamping entries with `schema_version`
    pub fn new(backend: B, schema_version: impl Into<String>) -> Self {
        Self::with_clock(backend, schema_version, Arc::new(SystemClock))
    }

    /// Create a store with an explicit time source
    pub fn with_clock(backend: B, schema_version: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            schema_version: schema_version.into(),
            clock,
            stats: CacheStats::new(),
        }
    }

    /// Schema tag entries are written with and checked against
    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Hit/miss counters
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Store `value` under `key`, expiring after `ttl` if given.
    ///
    /// Best effort: failures are logged and counted, never returned.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let Some(raw) = self.encode(key, value, ttl) else {
            return;
        };

        match self.backend.write(key, raw).await {
            Ok(()) => self.stats.record_write(),
            Err(e) => {
                error!("Cache.set({}) [{}] failed: {}", key, self.backend.name(), e);
                self.stats.record_write_failure();
            }
        }
    }

    /// Value under `key` if its entry is valid; otherwise the entry is deleted
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let read = self.backend.read(key).await;
        match self.resolve(key, read, entry::decode::<T>) {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss => None,
            Lookup::Invalid => {
                self.remove(key).await;
                None
            }
        }
    }

    /// Whether `key` holds a valid entry, deleting it if not
    pub async fn is_valid(&self, key: &str) -> bool {
        let read = self.backend.read(key).await;
        match self.resolve(key, read, check_only) {
            Lookup::Hit(()) => true,
            Lookup::Miss => false,
            Lookup::Invalid => {
                self.remove(key).await;
                false
            }
        }
    }

    /// Raw entry under `key` with its validity; never deletes
    pub async fn inspect(&self, key: &str) -> Option<Inspection> {
        let raw = match self.backend.read(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                error!("Cache.inspect({}) [{}] failed: {}", key, self.backend.name(), e);
                return None;
            }
        };

        let validity = entry::check(&raw, self.clock.now_millis(), &self.schema_version);
        let parsed = serde_json::from_str::<CacheEntry<serde_json::Value>>(&raw).ok();

        Some(Inspection {
            validity,
            expires_at: parsed
                .as_ref()
                .filter(|entry| entry.expires())
                .map(|entry| entry.expires_at),
            version: parsed.map(|entry| entry.version),
            raw,
        })
    }

    /// Delete `key`. Idempotent.
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            error!("Cache.remove({}) [{}] failed: {}", key, self.backend.name(), e);
        }
    }

    /// Delete every entry in this tier
    pub async fn clear(&self) {
        if let Err(e) = self.backend.clear().await {
            error!("Cache.clear() [{}] failed: {}", self.backend.name(), e);
        }
    }

    /// Sweep every key, deleting invalid and malformed entries.
    ///
    /// Meant to run once at start-up. A failing key is logged and skipped.
    pub async fn purge_expired(&self) -> PurgeReport {
        let mut report = PurgeReport::default();

        let keys = match self.backend.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                error!("Cache.purge_expired() [{}] failed to list keys: {}", self.backend.name(), e);
                return report;
            }
        };

        let now = self.clock.now_millis();
        for key in keys {
            let validity = match self.backend.read(&key).await {
                Ok(Some(raw)) => entry::check(&raw, now, &self.schema_version),
                Ok(None) => continue,
                Err(versedb::Error::Parse(_)) => Validity::Malformed,
                Err(e) => {
                    warn!("Cache.purge_expired() [{}] skipping {}: {}", self.backend.name(), key, e);
                    continue;
                }
            };

            if validity.is_valid() {
                report.kept += 1;
                continue;
            }

            match self.backend.delete(&key).await {
                Ok(()) => {
                    debug!("Purged {} ({:?})", key, validity);
                    self.stats.record_invalidation();
                    report.removed += 1;
                }
                Err(e) => {
                    warn!("Cache.purge_expired() [{}] could not delete {}: {}", self.backend.name(), key, e);
                }
            }
        }

        info!(
            "Cache cleanup [{}] → removed {}, kept {}",
            self.backend.name(),
            report.removed,
            report.kept
        );

        report
    }

    fn encode<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Option<String> {
        if key.is_empty() {
            warn!("Cache.set() [{}] ignored an empty key", self.backend.name());
            self.stats.record_write_failure();
            return None;
        }

        let entry = CacheEntry::new(value, ttl, self.clock.now_millis(), &self.schema_version);
        match serde_json::to_string(&entry) {
            Ok(raw) => Some(raw),
            Err(e) => {
                error!("Cache.set({}) [{}] could not serialize value: {}", key, self.backend.name(), e);
                self.stats.record_write_failure();
                None
            }
        }
    }

    fn resolve<T>(
        &self,
        key: &str,
        read: versedb::Result<Option<String>>,
        decode: impl FnOnce(&str, i64, &str) -> Result<T, Validity>,
    ) -> Lookup<T> {
        let raw = match read {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.stats.record_miss();
                return Lookup::Miss;
            }
            Err(versedb::Error::Parse(msg)) => {
                warn!("Cache.get({}) [{}] unreadable entry: {}", key, self.backend.name(), msg);
                self.stats.record_invalidation();
                self.stats.record_miss();
                return Lookup::Invalid;
            }
            Err(e) => {
                error!("Cache.get({}) [{}] failed: {}", key, self.backend.name(), e);
                self.stats.record_miss();
                return Lookup::Miss;
            }
        };

        match decode(&raw, self.clock.now_millis(), &self.schema_version) {
            Ok(value) => {
                self.stats.record_hit();
                Lookup::Hit(value)
            }
            Err(validity) => {
                debug!("Cache.get({}) [{}] dropping {:?} entry", key, self.backend.name(), validity);
                self.stats.record_invalidation();
                self.stats.record_miss();
                Lookup::Invalid
            }
        }
    }
}

impl<B: BlockingBackend> CacheStore<B> {
    /// [`CacheStore::get`] without suspending, for tiers that support it
    pub fn get_blocking<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let read = self.backend.read_blocking(key);
        match self.resolve(key, read, entry::decode::<T>) {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss => None,
            Lookup::Invalid => {
                if let Err(e) = self.backend.delete_blocking(key) {
                    error!("Cache.remove({}) [{}] failed: {}", key, self.backend.name(), e);
                }
                None
            }
        }
    }
}

fn check_only(raw: &str, now_millis: i64, version: &str) -> Result<(), Validity> {
    match entry::check(raw, now_millis, version) {
        Validity::Valid => Ok(()),
        invalid => Err(invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LogBackend, MemoryBackend};
    use crate::clock::ManualClock;
    use crate::ttl::{DAY, HOUR, MONTH};
    use serde::Deserialize;
    use tempfile::TempDir;

    const START: i64 = 1_700_000_000_000;

    fn store_at(version: &str) -> (CacheStore<MemoryBackend>, MemoryBackend, Arc<ManualClock>) {
        let backend = MemoryBackend::new();
        let clock = Arc::new(ManualClock::new(START));
        let store = CacheStore::with_clock(backend.clone(), version, clock.clone());
        (store, backend, clock)
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ReadingLocation {
        book: String,
        chapter: u32,
        page: u32,
    }

    #[tokio::test]
    async fn test_round_trip_before_expiry() {
        let (store, _, clock) = store_at("v1");
        let location = ReadingLocation {
            book: "Genesis".to_string(),
            chapter: 1,
            page: 1,
        };

        store.set("reading_location", &location, Some(DAY)).await;
        clock.advance(Duration::from_secs(86_399));

        assert_eq!(store.get::<ReadingLocation>("reading_location").await, Some(location));
    }

    #[tokio::test]
    async fn test_hello_expires_after_an_hour() {
        let (store, backend, clock) = store_at("v1");

        store.set("k", "hello", Some(HOUR)).await;
        assert_eq!(store.get::<String>("k").await.as_deref(), Some("hello"));

        clock.advance(Duration::from_secs(3_601));
        assert_eq!(store.get::<String>("k").await, None);
        assert_eq!(backend.read("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_no_ttl_never_expires() {
        let (store, _, clock) = store_at("v1");

        store.set("ai_thinking_sound_enabled", &true, None).await;
        clock.advance(MONTH * 120);

        assert_eq!(store.get::<bool>("ai_thinking_sound_enabled").await, Some(true));
    }

    #[tokio::test]
    async fn test_schema_bump_invalidates_entries() {
        let backend = MemoryBackend::new();
        let clock = Arc::new(ManualClock::new(START));

        let v1 = CacheStore::with_clock(backend.clone(), "v1", clock.clone());
        v1.set("theme", "sepia", None).await;
        v1.set("pages", &vec![1, 2, 3], Some(MONTH)).await;

        let v2 = CacheStore::with_clock(backend.clone(), "v2", clock.clone());
        assert_eq!(v2.get::<String>("theme").await, None);
        assert_eq!(v2.get::<Vec<u32>>("pages").await, None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_deleted() {
        let (store, backend, _) = store_at("v1");
        backend.write("broken", "{\"value\": tru".to_string()).await.unwrap();

        assert_eq!(store.get::<bool>("broken").await, None);
        assert_eq!(backend.read("broken").await.unwrap(), None);
        assert_eq!(store.stats().snapshot().invalidations, 1);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_treated_as_corrupt() {
        let (store, backend, _) = store_at("v1");
        store.set("ai_mode", "Study", None).await;

        assert_eq!(store.get::<u32>("ai_mode").await, None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_entry() {
        let (store, _, clock) = store_at("v1");

        store.set("k", "first", Some(HOUR)).await;
        store.set("k", "second", None).await;
        clock.advance(DAY);

        assert_eq!(store.get::<String>("k").await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let (store, backend, _) = store_at("v1");

        store.set("a", &1, None).await;
        store.set("b", &2, None).await;
        store.remove("a").await;
        store.remove("a").await;

        assert_eq!(store.get::<i32>("a").await, None);
        assert_eq!(store.get::<i32>("b").await, Some(2));

        store.clear().await;
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_empty_key_is_ignored() {
        let (store, backend, _) = store_at("v1");

        store.set("", "nothing", None).await;

        assert!(backend.is_empty());
        assert_eq!(store.stats().snapshot().write_failures, 1);
    }

    #[tokio::test]
    async fn test_is_valid() {
        let (store, backend, clock) = store_at("v1");

        store.set("k", "v", Some(HOUR)).await;
        assert!(store.is_valid("k").await);
        assert!(!store.is_valid("missing").await);

        clock.advance(HOUR);
        assert!(!store.is_valid("k").await);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_purge_removes_only_invalid_entries() {
        let backend = MemoryBackend::new();
        let clock = Arc::new(ManualClock::new(START));

        let old = CacheStore::with_clock(backend.clone(), "v0", clock.clone());
        old.set("stale", "from an older schema", None).await;

        let store = CacheStore::with_clock(backend.clone(), "v1", clock.clone());
        store.set("fresh", "still good", Some(DAY)).await;
        store.set("forever", &42, None).await;
        store.set("short", "gone soon", Some(HOUR)).await;
        backend.write("corrupt", "not json".to_string()).await.unwrap();
        backend
            .write("no_expiry", r#"{"value":1,"version":"v1"}"#.to_string())
            .await
            .unwrap();

        clock.advance(HOUR * 2);
        let report = store.purge_expired().await;

        assert_eq!(report, PurgeReport { removed: 4, kept: 2 });
        let mut keys = backend.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["forever".to_string(), "fresh".to_string()]);
        assert_eq!(store.get::<String>("fresh").await.as_deref(), Some("still good"));
        assert_eq!(store.get::<i32>("forever").await, Some(42));
    }

    #[tokio::test]
    async fn test_purge_on_empty_store() {
        let (store, _, _) = store_at("v1");
        assert_eq!(store.purge_expired().await, PurgeReport::default());
    }

    #[tokio::test]
    async fn test_get_blocking() {
        let (store, backend, clock) = store_at("v1");
        store.set("app_theme", "sepia", Some(HOUR)).await;

        assert_eq!(store.get_blocking::<String>("app_theme").as_deref(), Some("sepia"));

        clock.advance(HOUR);
        assert_eq!(store.get_blocking::<String>("app_theme"), None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_inspect_does_not_delete() {
        let (store, backend, clock) = store_at("v1");
        store.set("k", "v", Some(HOUR)).await;
        clock.advance(HOUR);

        let inspection = store.inspect("k").await.unwrap();
        assert_eq!(inspection.validity, Validity::Expired);
        assert_eq!(inspection.expires_at, Some(START + 3_600_000));
        assert_eq!(inspection.version.as_deref(), Some("v1"));
        assert_eq!(backend.len(), 1);

        assert!(store.inspect("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let (store, _, _) = store_at("v1");

        store.set("k", "v", None).await;
        store.get::<String>("k").await;
        store.get::<String>("k").await;
        store.get::<String>("absent").await;

        assert_eq!(store.stats().snapshot().writes, 1);
        assert_eq!(store.stats().snapshot().hits, 2);
        assert_eq!(store.stats().snapshot().misses, 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_on_different_keys() {
        let (store, backend, _) = store_at("v1");
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for verse in 1..=16u32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let key = format!("KJV:John:3:{}:Explanation:Study", verse);
                store.set(&key, &format!("explanation {}", verse), Some(MONTH)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(backend.len(), 16);
        assert_eq!(
            store.get::<String>("KJV:John:3:16:Explanation:Study").await.as_deref(),
            Some("explanation 16")
        );
    }

    #[tokio::test]
    async fn test_large_tier_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(START));

        {
            let backend = LogBackend::open(dir.path(), 1024).unwrap();
            let store = CacheStore::with_clock(backend, "v1", clock.clone());
            store.set("summary:Genesis:1", "In the beginning...", Some(MONTH)).await;
            store.set("short", "lived", Some(HOUR)).await;
            store.backend().store().close().unwrap();
        }

        clock.advance(DAY);
        let backend = LogBackend::open(dir.path(), 1024).unwrap();
        let store = CacheStore::with_clock(backend, "v1", clock.clone());

        assert_eq!(
            store.get::<String>("summary:Genesis:1").await.as_deref(),
            Some("In the beginning...")
        );
        assert_eq!(store.purge_expired().await, PurgeReport { removed: 1, kept: 1 });
        assert!(!store.backend().store().contains("short"));
    }
}
