//! Per-tier counters

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one cache tier, updated without locking
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Reads that returned a value
    pub hits: u64,
    /// Reads that returned nothing, including invalidated entries
    pub misses: u64,
    /// Entries deleted as expired, stale or malformed
    pub invalidations: u64,
    /// Writes that reached the backend
    pub writes: u64,
    /// Writes dropped on a serialization or storage error
    pub write_failures: u64,
}

impl StatsSnapshot {
    /// Fraction of reads that hit, 0.0 when nothing was read
    pub fn hit_ratio(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            reads => self.hits as f64 / reads as f64,
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} invalidated={} writes={} failed_writes={} hit_ratio={:.2}",
            self.hits,
            self.misses,
            self.invalidations,
            self.writes,
            self.write_failures,
            self.hit_ratio()
        )
    }
}

impl CacheStats {
    /// Zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        bump(&self.hits);
    }

    pub(crate) fn record_miss(&self) {
        bump(&self.misses);
    }

    pub(crate) fn record_invalidation(&self) {
        bump(&self.invalidations);
    }

    pub(crate) fn record_write(&self) {
        bump(&self.writes);
    }

    pub(crate) fn record_write_failure(&self) {
        bump(&self.write_failures);
    }

    /// Copy every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.invalidations,
            &self.writes,
            &self.write_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}
