//! # versecache
//!
//! Key-value cache with expiry and schema versioning for the verse reader.
//!
//! ## Architecture
//! - **Entries**: JSON `{ value, expiresAt, version }`; `expiresAt = -1` never expires
//! - **Validity**: current schema tag and not past the deadline; anything else is
//!   deleted on first read and reported as a miss
//! - **Tiers**: one generic [`CacheStore`] over a [`Backend`]; the small tier
//!   ([`PrefsBackend`]) also serves blocking reads, the large tier
//!   ([`LogBackend`]) is async only
//! - **Maintenance**: [`CacheStore::purge_expired`] sweeps a tier once at start-up
//!
//! Bumping the schema version is the migration strategy: every older entry
//! becomes a miss the next time it is read.

#![warn(missing_docs)]

mod backend;
mod clock;
mod config;
mod entry;
pub mod keys;
mod stats;
mod store;
pub mod ttl;

pub use backend::{Backend, BlockingBackend, LogBackend, MemoryBackend, PrefsBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, CacheTiers, DEFAULT_SCHEMA_VERSION, LARGE_TIER_DIR, SMALL_TIER_DIR};
pub use entry::{CacheEntry, Validity, NEVER_EXPIRES};
pub use keys::StorageKey;
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{CacheStore, Inspection, PurgeReport};
pub use ttl::Ttl;
