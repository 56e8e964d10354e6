//! Key/value text stores
//!
//! Both backends enforce an optional byte quota and refuse a write that
//! would exceed it with [`Error::QuotaExceeded`], leaving the previous
//! value in place. A write either lands completely or not at all.

use commentlens_core::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A size-bounded key/value text store
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    fn keys(&self) -> Result<Vec<String>>;
}

/// In-memory store. Usage counts key and value bytes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    quota: Option<usize>,
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Bytes currently used
    pub fn usage(&self) -> usize {
        self.entries.lock().iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();

        if let Some(quota) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = key.len() + value.len();
            if used + needed > quota {
                return Err(Error::quota(format!(
                    "writing {key} needs {needed} bytes, {} of {quota} available",
                    quota.saturating_sub(used)
                )));
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}

/// On-disk record; the key is kept so it can be listed back
#[derive(Serialize, Deserialize)]
struct StoredValue {
    key: String,
    value: String,
}

/// Directory-backed store, one file per key. File names are the SHA-256 of
/// the key. Writes go to a temporary file that is renamed into place.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: Option<u64>,
}

const FILE_EXT: &str = "json";
const TMP_EXT: &str = "tmp";

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>, quota: Option<u64>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| Error::storage(format!("cannot create store directory {}: {e}", dir.display())))?;
        debug!("Opened file store at {:?}", dir);
        Ok(Self { dir, quota })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{digest:x}.{FILE_EXT}"))
    }

    fn stored_files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| Error::storage(format!("cannot list {}: {e}", self.dir.display())))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == FILE_EXT) {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Bytes currently used by stored files
    pub fn usage(&self) -> Result<u64> {
        let mut total = 0;
        for path in self.stored_files()? {
            total += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        }
        Ok(total)
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let raw = match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::storage(format!("cannot read {key}: {e}"))),
        };

        let stored: StoredValue = serde_json::from_str(&raw)?;
        if stored.key != key {
            return Err(Error::storage(format!("hash collision for {key}")));
        }
        Ok(Some(stored.value))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let encoded = serde_json::to_string(&StoredValue {
            key: key.to_string(),
            value: value.to_string(),
        })?;

        if let Some(quota) = self.quota {
            let existing = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            let used = self.usage()?.saturating_sub(existing);
            let needed = encoded.len() as u64;
            if used + needed > quota {
                return Err(Error::quota(format!(
                    "writing {key} needs {needed} bytes, {} of {quota} available",
                    quota.saturating_sub(used)
                )));
            }
        }

        let tmp = path.with_extension(TMP_EXT);
        fs::write(&tmp, encoded.as_bytes()).map_err(|e| Error::storage(format!("cannot write {key}: {e}")))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(Error::storage(format!("cannot replace {key}: {e}")));
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(format!("cannot remove {key}: {e}"))),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for path in self.stored_files()? {
            let parsed = fs::read_to_string(&path)
                .ok()
                .and_then(|raw| serde_json::from_str::<StoredValue>(&raw).ok());
            match parsed {
                Some(stored) => keys.push(stored.key),
                None => warn!("Skipping unreadable store file {:?}", path),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_quota() {
        let store = MemoryStore::with_quota(10);

        store.set("a", "1234").unwrap();
        // replacing a value only counts the new size
        store.set("a", "123456789").unwrap();
        assert!(store.set("b", "1").unwrap_err().is_quota());
        assert_eq!(store.get("a").unwrap().as_deref(), Some("123456789"));
        assert_eq!(store.get("b").unwrap(), None);

        store.remove("a").unwrap();
        store.set("b", "1").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["b".to_string()]);
        assert_eq!(store.usage(), 2);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), None).unwrap();

        store.set("commentlens:video:BV1", "{\"x\":1}").unwrap();
        store.set("commentlens:index", "[]").unwrap();
        assert_eq!(store.get("commentlens:video:BV1").unwrap().as_deref(), Some("{\"x\":1}"));
        assert_eq!(store.get("missing").unwrap(), None);
        assert_eq!(
            store.keys().unwrap(),
            vec!["commentlens:index".to_string(), "commentlens:video:BV1".to_string()]
        );

        store.remove("commentlens:index").unwrap();
        store.remove("commentlens:index").unwrap();
        assert_eq!(store.keys().unwrap().len(), 1);

        // reopening sees the same data
        let reopened = FileStore::open(dir.path(), None).unwrap();
        assert!(reopened.get("commentlens:video:BV1").unwrap().is_some());
    }

    #[test]
    fn test_file_store_quota() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), Some(120)).unwrap();

        store.set("first", &"x".repeat(50)).unwrap();
        let err = store.set("second", &"y".repeat(50)).unwrap_err();
        assert!(err.is_quota());
        assert_eq!(store.get("second").unwrap(), None);
        assert!(store.usage().unwrap() <= 120);
    }
}
