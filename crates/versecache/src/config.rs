//! Cache configuration and two-tier setup

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::backend::{LogBackend, PrefsBackend};
use crate::clock::{Clock, SystemClock};
use crate::store::{CacheStore, PurgeReport};

/// Schema tag used when none is configured
pub const DEFAULT_SCHEMA_VERSION: &str = "v1";

/// Subdirectory of the data directory holding the small tier
pub const SMALL_TIER_DIR: &str = "small";

/// Subdirectory of the data directory holding the large tier
pub const LARGE_TIER_DIR: &str = "large";

/// Knobs shared by both tiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Current schema tag. Changing it invalidates every existing entry.
    pub schema_version: String,
    /// Byte budget of the large tier's read cache
    pub read_cache_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            read_cache_bytes: versedb::DEFAULT_READ_CACHE_BYTES,
        }
    }
}

/// Both cache tiers opened under one data directory
pub struct CacheTiers {
    /// Preferences and other small scalars; supports blocking reads
    pub small: Arc<CacheStore<PrefsBackend>>,
    /// Chapter layouts and long generated text
    pub large: Arc<CacheStore<LogBackend>>,
}

impl CacheTiers {
    /// Open `<dir>/small` and `<dir>/large`
    pub fn open<P: AsRef<Path>>(dir: P, config: &CacheConfig) -> versedb::Result<Self> {
        Self::open_with_clock(dir, config, Arc::new(SystemClock))
    }

    /// Open both tiers sharing an explicit time source
    pub fn open_with_clock<P: AsRef<Path>>(
        dir: P,
        config: &CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> versedb::Result<Self> {
        let dir = dir.as_ref();
        let small = PrefsBackend::open(dir.join(SMALL_TIER_DIR))?;
        let large = LogBackend::open(dir.join(LARGE_TIER_DIR), config.read_cache_bytes)?;

        info!(
            "Opened cache tiers in {:?} (schema {})",
            dir, config.schema_version
        );

        Ok(Self {
            small: Arc::new(CacheStore::with_clock(
                small,
                config.schema_version.clone(),
                Arc::clone(&clock),
            )),
            large: Arc::new(CacheStore::with_clock(large, config.schema_version.clone(), clock)),
        })
    }

    /// Start-up sweep of both tiers. Returns (small, large) reports.
    pub async fn purge_expired(&self) -> (PurgeReport, PurgeReport) {
        let small = self.small.purge_expired().await;
        let large = self.large.purge_expired().await;
        (small, large)
    }

    /// Full reset of both tiers
    pub async fn clear_all(&self) {
        self.small.clear().await;
        self.large.clear().await;
    }
}
