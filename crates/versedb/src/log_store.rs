//! Append-only log engine for large values
//!
//! File layout:
//! - `cache.vlog`: header + put/delete records (see [`crate::format`])
//!
//! The key index lives in memory and is rebuilt on open by replaying the
//! log. Overwrites and deletes leave dead bytes behind; once they reach
//! [`AUTO_COMPACT_MIN_DEAD_BYTES`] and outweigh the live records, the next
//! write rewrites the file (see [`LogStore::compact`]).
//!
//! A log whose header is unreadable is moved aside to `cache.vlog.corrupt`
//! and replaced by an empty one.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahash::RandomState;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::format::{
    create_header, encode_record, parse_header, parse_record, RecordKind, HEADER_LEN,
    RECORD_PREFIX_LEN,
};
use crate::lru::ByteLru;

/// Log file name inside the store directory
pub const LOG_FILE: &str = "cache.vlog";

/// Maximum key size (64 KB)
const MAX_KEY_SIZE: usize = 64 * 1024;

/// Maximum value size (16 MB)
const MAX_VALUE_SIZE: usize = 16 * 1024 * 1024;

/// Maximum log file size (1 GB)
const MAX_LOG_SIZE: u64 = 1024 * 1024 * 1024;

/// Dead bytes a log must carry before a write triggers compaction (1 MB)
pub const AUTO_COMPACT_MIN_DEAD_BYTES: u64 = 1024 * 1024;

/// Suffix given to a log that could not be opened
const CORRUPT_SUFFIX: &str = "corrupt";

/// Default read cache budget (8 MB)
pub const DEFAULT_READ_CACHE_BYTES: usize = 8 * 1024 * 1024;

/// Where a live value sits in the log
#[derive(Debug, Clone, Copy)]
struct ValueLoc {
    /// Offset of the value bytes
    offset: u64,
    /// Value length
    len: u32,
    /// Length of the whole record, for dead-byte accounting
    record_len: u64,
}

struct LogFile {
    file: File,
    /// End of the last valid record
    size: u64,
    /// Bytes held by overwritten or deleted records
    dead: u64,
}

/// LogStore is the large-value storage engine
pub struct LogStore {
    /// Directory holding the log
    dir: PathBuf,

    /// In-memory index: key -> value location
    index: RwLock<HashMap<String, ValueLoc, RandomState>>,

    /// Log file handle and size bookkeeping
    log: Mutex<LogFile>,

    /// Hot values
    read_cache: Mutex<ByteLru>,

    /// Is the store closed?
    closed: AtomicBool,
}

impl LogStore {
    /// Open or create a log store in `dir` with the default read cache
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_with_cache(dir, DEFAULT_READ_CACHE_BYTES)
    }

    /// Open or create a log store in `dir`, caching up to `read_cache_bytes` of values
    pub fn open_with_cache<P: AsRef<Path>>(dir: P, read_cache_bytes: usize) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(LOG_FILE);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let empty = || (HashMap::with_hasher(RandomState::new()), HEADER_LEN as u64, 0);
        let (index, size, dead) = if file.metadata()?.len() == 0 {
            file.write_all(&create_header())?;
            file.sync_all()?;
            empty()
        } else {
            match Self::replay(&mut file) {
                Ok(replayed) => replayed,
                Err(Error::Parse(msg)) => {
                    let aside = path.with_extension(format!("vlog.{}", CORRUPT_SUFFIX));
                    warn!("Unreadable log {:?} ({}), moving it to {:?}", path, msg, aside);
                    drop(file);
                    fs::rename(&path, &aside)?;
                    file = OpenOptions::new()
                        .read(true)
                        .write(true)
                        .create_new(true)
                        .open(&path)?;
                    file.write_all(&create_header())?;
                    file.sync_all()?;
                    empty()
                }
                Err(e) => return Err(e),
            }
        };

        let file_len = file.metadata()?.len();
        if file_len > size {
            warn!(
                "Truncating {} trailing bytes of torn or corrupt log data in {:?}",
                file_len - size,
                path
            );
            file.set_len(size)?;
            file.sync_all()?;
        }

        debug!("Opened log store {:?}: {} keys, {} bytes", path, index.len(), size);

        Ok(Self {
            dir: dir.to_path_buf(),
            index: RwLock::new(index),
            log: Mutex::new(LogFile { file, size, dead }),
            read_cache: Mutex::new(ByteLru::new(read_cache_bytes)),
            closed: AtomicBool::new(false),
        })
    }

    /// Rebuild the index from the log. Returns (index, valid length, dead bytes).
    #[allow(clippy::type_complexity)]
    fn replay(file: &mut File) -> Result<(HashMap<String, ValueLoc, RandomState>, u64, u64)> {
        let mut bytes = Vec::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut bytes)?;
        parse_header(&bytes)?;

        let mut index: HashMap<String, ValueLoc, RandomState> =
            HashMap::with_hasher(RandomState::new());
        let mut dead = 0u64;
        let mut pos = HEADER_LEN;

        while pos < bytes.len() {
            let (_, record) = match parse_record(&bytes[pos..]) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Stopping log replay at offset {}: {:?}", pos, e);
                    break;
                }
            };
            let record_len = record.encoded_len() as u64;

            let key = match std::str::from_utf8(record.key) {
                Ok(key) => key.to_string(),
                Err(_) => {
                    warn!("Skipping record with non UTF-8 key at offset {}", pos);
                    dead += record_len;
                    pos += record_len as usize;
                    continue;
                }
            };

            match record.kind {
                RecordKind::Put => {
                    let loc = ValueLoc {
                        offset: (pos + RECORD_PREFIX_LEN + record.key.len()) as u64,
                        len: record.value.len() as u32,
                        record_len,
                    };
                    if let Some(old) = index.insert(key, loc) {
                        dead += old.record_len;
                    }
                }
                RecordKind::Delete => {
                    if let Some(old) = index.remove(&key) {
                        dead += old.record_len;
                    }
                    dead += record_len;
                }
            }

            pos += record_len as usize;
        }

        Ok((index, pos as u64, dead))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.ensure_open()?;

        if key.len() > MAX_KEY_SIZE {
            return Err(Error::KeyTooLarge(key.len()));
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(Error::ValueTooLarge(value.len()));
        }

        let record = encode_record(RecordKind::Put, key.as_bytes(), value);

        let mut index = self.index.write();
        let mut log = self.log.lock();

        if log.size + record.len() as u64 > MAX_LOG_SIZE && log.dead > 0 {
            self.compact_locked(&mut index, &mut log)?;
        }
        if log.size + record.len() as u64 > MAX_LOG_SIZE {
            return Err(Error::StoreFull(log.size));
        }

        let offset = log.size;
        log.file.seek(SeekFrom::Start(offset))?;
        log.file.write_all(&record)?;
        log.size += record.len() as u64;

        let loc = ValueLoc {
            offset: offset + (RECORD_PREFIX_LEN + key.len()) as u64,
            len: value.len() as u32,
            record_len: record.len() as u64,
        };
        if let Some(old) = index.insert(key.to_string(), loc) {
            log.dead += old.record_len;
        }

        self.read_cache.lock().insert(key, Arc::from(value));
        self.maybe_compact(&mut index, &mut log);

        Ok(())
    }

    /// Fetch the value stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;

        let index = self.index.read();
        let Some(loc) = index.get(key).copied() else {
            return Ok(None);
        };

        if let Some(hot) = self.read_cache.lock().get(key) {
            return Ok(Some(hot.to_vec()));
        }

        let mut value = vec![0u8; loc.len as usize];
        {
            let mut log = self.log.lock();
            log.file.seek(SeekFrom::Start(loc.offset))?;
            log.file.read_exact(&mut value)?;
        }
        drop(index);

        self.read_cache.lock().insert(key, Arc::from(value.as_slice()));

        Ok(Some(value))
    }

    /// Remove `key`. Returns whether it was present.
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;

        let mut index = self.index.write();
        let Some(old) = index.remove(key) else {
            return Ok(false);
        };

        let record = encode_record(RecordKind::Delete, key.as_bytes(), &[]);
        let mut log = self.log.lock();
        let offset = log.size;
        log.file.seek(SeekFrom::Start(offset))?;
        if let Err(e) = log.file.write_all(&record) {
            index.insert(key.to_string(), old);
            return Err(e.into());
        }
        log.size += record.len() as u64;
        log.dead += old.record_len + record.len() as u64;

        self.read_cache.lock().remove(key);
        self.maybe_compact(&mut index, &mut log);

        Ok(true)
    }

    /// Whether `key` currently has a value
    pub fn contains(&self, key: &str) -> bool {
        self.index.read().contains_key(key)
    }

    /// All live keys, in no particular order
    pub fn keys(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.index.read().keys().cloned().collect())
    }

    /// Drop every record, leaving an empty log
    pub fn clear(&self) -> Result<()> {
        self.ensure_open()?;

        let mut index = self.index.write();
        let mut log = self.log.lock();

        log.file.set_len(HEADER_LEN as u64)?;
        log.file.sync_data()?;
        log.size = HEADER_LEN as u64;
        log.dead = 0;
        index.clear();
        self.read_cache.lock().clear();

        Ok(())
    }

    /// Rewrite the log with live records only. Returns the bytes reclaimed.
    pub fn compact(&self) -> Result<u64> {
        self.ensure_open()?;

        let mut index = self.index.write();
        let mut log = self.log.lock();
        self.compact_locked(&mut index, &mut log)
    }

    /// Compact after a write once dead records dominate the file.
    ///
    /// The write itself already succeeded, so a failure here is only logged.
    fn maybe_compact(&self, index: &mut HashMap<String, ValueLoc, RandomState>, log: &mut LogFile) {
        if log.dead < AUTO_COMPACT_MIN_DEAD_BYTES || log.dead * 2 <= log.size {
            return;
        }
        if let Err(e) = self.compact_locked(index, log) {
            warn!("Automatic compaction of {:?} failed: {}", self.dir, e);
        }
    }

    fn compact_locked(
        &self,
        index: &mut HashMap<String, ValueLoc, RandomState>,
        log: &mut LogFile,
    ) -> Result<u64> {
        let path = self.dir.join(LOG_FILE);
        let tmp_path = self.dir.join(format!("{}.compact", LOG_FILE));

        let mut tmp = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        tmp.write_all(&create_header())?;

        let mut new_size = HEADER_LEN as u64;
        let mut relocated = Vec::with_capacity(index.len());
        for (key, loc) in index.iter() {
            let mut value = vec![0u8; loc.len as usize];
            log.file.seek(SeekFrom::Start(loc.offset))?;
            log.file.read_exact(&mut value)?;

            let record = encode_record(RecordKind::Put, key.as_bytes(), &value);
            tmp.write_all(&record)?;
            relocated.push((
                key.clone(),
                ValueLoc {
                    offset: new_size + (RECORD_PREFIX_LEN + key.len()) as u64,
                    len: loc.len,
                    record_len: record.len() as u64,
                },
            ));
            new_size += record.len() as u64;
        }
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &path)?;
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let reclaimed = log.size.saturating_sub(new_size);
        log.file = file;
        log.size = new_size;
        log.dead = 0;
        for (key, loc) in relocated {
            index.insert(key, loc);
        }

        info!("Compacted {:?}: reclaimed {} bytes", path, reclaimed);

        Ok(reclaimed)
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Current log size in bytes
    pub fn size_bytes(&self) -> u64 {
        self.log.lock().size
    }

    /// Bytes held by overwritten or deleted records
    pub fn dead_bytes(&self) -> u64 {
        self.log.lock().dead
    }

    /// Close the store and fsync all changes. Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let log = self.log.lock();
        log.file.sync_all()?;

        Ok(())
    }
}

impl Drop for LogStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
