//! Snapshot engine for small values
//!
//! The whole map is held in memory and written out as one JSON object on
//! every change. Writes go to a temp file that is renamed over `prefs.json`.
//! A snapshot that does not parse is moved to `prefs.json.corrupt` and the
//! store starts empty.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Snapshot file name inside the store directory
pub const PREFS_FILE: &str = "prefs.json";

/// Maximum value size (1 MB)
const MAX_VALUE_SIZE: usize = 1024 * 1024;

/// PrefsFile is the small-value storage engine
pub struct PrefsFile {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl PrefsFile {
    /// Open or create a prefs store in `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(PREFS_FILE);

        let entries = if path.exists() {
            let raw = fs::read(&path)?;
            if raw.iter().all(u8::is_ascii_whitespace) {
                BTreeMap::new()
            } else {
                match serde_json::from_slice(&raw) {
                    Ok(entries) => entries,
                    Err(e) => {
                        let aside = path.with_extension("json.corrupt");
                        warn!("Unreadable prefs {:?} ({}), moving it to {:?}", path, e, aside);
                        fs::rename(&path, &aside)?;
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!("Opened prefs store {:?}: {} keys", path, entries.len());

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Fetch the value stored under `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Store `value` under `key` and persist the snapshot
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        if value.len() > MAX_VALUE_SIZE {
            return Err(Error::ValueTooLarge(value.len()));
        }

        let mut entries = self.entries.write();
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }

        Ok(())
    }

    /// Remove `key`. Returns whether it was present.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write();
        let Some(old) = entries.remove(key) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&entries) {
            entries.insert(key.to_string(), old);
            return Err(e);
        }

        Ok(true)
    }

    /// All keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Drop every entry
    pub fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write();
        let snapshot = std::mem::take(&mut *entries);
        if let Err(e) = self.persist(&entries) {
            *entries = snapshot;
            return Err(e);
        }

        Ok(())
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_vec(entries)?;

        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(&json)?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_and_get() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsFile::open(dir.path()).unwrap();

        prefs.put("ai_mode", "\"Devotional\"").unwrap();

        assert_eq!(prefs.get("ai_mode").as_deref(), Some("\"Devotional\""));
        assert_eq!(prefs.get("theme"), None);
        assert_eq!(prefs.len(), 1);
    }

    #[test]
    fn test_persistence() {
        let dir = TempDir::new().unwrap();

        {
            let prefs = PrefsFile::open(dir.path()).unwrap();
            prefs.put("a", "1").unwrap();
            prefs.put("b", "2").unwrap();
            prefs.delete("a").unwrap();
        }

        let prefs = PrefsFile::open(dir.path()).unwrap();
        assert_eq!(prefs.keys(), vec!["b".to_string()]);
        assert_eq!(prefs.get("b").as_deref(), Some("2"));
        assert!(!dir.path().join("prefs.json.tmp").exists());
    }

    #[test]
    fn test_delete_missing_key() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsFile::open(dir.path()).unwrap();

        assert!(!prefs.delete("absent").unwrap());
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsFile::open(dir.path()).unwrap();

        prefs.put("a", "1").unwrap();
        prefs.clear().unwrap();

        assert!(prefs.is_empty());
        let reopened = PrefsFile::open(dir.path()).unwrap();
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_value_too_large() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsFile::open(dir.path()).unwrap();

        let large = "x".repeat(MAX_VALUE_SIZE + 1);
        assert!(matches!(prefs.put("k", &large), Err(Error::ValueTooLarge(_))));
        assert!(prefs.get("k").is_none());
    }

    #[test]
    fn test_corrupt_snapshot_opens_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PREFS_FILE), "{trunc").unwrap();

        let prefs = PrefsFile::open(dir.path()).unwrap();
        assert!(prefs.is_empty());
        assert_eq!(
            fs::read_to_string(dir.path().join("prefs.json.corrupt")).unwrap(),
            "{trunc"
        );

        prefs.put("app_theme", "\"sepia\"").unwrap();
        let reopened = PrefsFile::open(dir.path()).unwrap();
        assert_eq!(reopened.get("app_theme").as_deref(), Some("\"sepia\""));
    }

    #[test]
    fn test_non_utf8_snapshot_opens_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PREFS_FILE), [0xff, 0xfe, 0x00]).unwrap();

        let prefs = PrefsFile::open(dir.path()).unwrap();
        assert!(prefs.is_empty());
    }
}
