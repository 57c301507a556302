//! # versedb
//!
//! Embedded key-value storage engines for the verse reader cache.
//!
//! ## Engines
//! - [`PrefsFile`]: small values, whole map in memory, atomic JSON snapshots
//! - [`LogStore`]: large values, append-only log with an in-memory index,
//!   automatic compaction and a byte-budgeted read cache
//!
//! A file either engine cannot parse is moved aside and the engine starts
//! empty; both only ever hold cached data.
//!
//! Both engines store opaque strings/bytes under string keys. Expiry and
//! schema versioning live one layer up, in `versecache`.

#![warn(missing_docs)]

mod error;
pub mod format;
mod log_store;
mod lru;
mod prefs;

pub use error::{Error, Result};
pub use log_store::{LogStore, AUTO_COMPACT_MIN_DEAD_BYTES, DEFAULT_READ_CACHE_BYTES, LOG_FILE};
pub use prefs::{PrefsFile, PREFS_FILE};
