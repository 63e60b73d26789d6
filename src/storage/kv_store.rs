//! `KvStore` trait and implementations.
//!
//! The persistence substrate is an opaque key-value blob store. The
//! container and engine only ever get/set two named entries (the serialized
//! dataset and the scenario map); everything else about durability is this
//! module's concern.

use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Errors that can occur in the key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Data directory is locked by another process: {}", .0.display())]
    Locked(PathBuf),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Trait for key-value storage backends.
pub trait KvStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the entry under `key`; removing a missing key is a no-op.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Thread-safe handle to any store.
pub type SharedKvStore = Arc<dyn KvStore>;

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryKvStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for InMemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().expect("lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().expect("lock poisoned");
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().expect("lock poisoned");
        entries.remove(key);
        Ok(())
    }
}

/// File-backed store: one `<key>.json` file per key under a data directory.
///
/// An exclusive advisory lock is taken on the directory's lock file for the
/// store's lifetime, so two processes never write the same snapshot files.
#[derive(Debug)]
pub struct FileKvStore {
    dir: PathBuf,
    _lock: File,
}

impl FileKvStore {
    /// Creates or opens a file-backed store rooted at `dir`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or the lock is
    /// held by another process.
    pub fn open(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(".lock"))?;
        lock.try_lock_exclusive()
            .map_err(|_| StorageError::Locked(dir.clone()))?;
        Ok(Self { dir, _lock: lock })
    }

    /// Returns the data directory this store writes into.
    #[must_use]
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // Write-then-rename keeps the entry intact if the process dies
        // mid-write.
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(tmp, self.entry_path(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_set_get_remove() {
        let store = InMemoryKvStore::new();
        assert!(store.get("finance_data").unwrap().is_none());

        store.set("finance_data", "{}").unwrap();
        assert_eq!(store.get("finance_data").unwrap().as_deref(), Some("{}"));

        store.remove("finance_data").unwrap();
        assert!(store.get("finance_data").unwrap().is_none());

        // removing again is a no-op
        store.remove("finance_data").unwrap();
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = FileKvStore::open(dir.path().to_path_buf()).unwrap();
            store.set("finance_data", r#"{"menu":[]}"#).unwrap();
        }

        {
            let store = FileKvStore::open(dir.path().to_path_buf()).unwrap();
            assert_eq!(
                store.get("finance_data").unwrap().as_deref(),
                Some(r#"{"menu":[]}"#)
            );
        }
    }

    #[test]
    fn file_store_set_replaces_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path().to_path_buf()).unwrap();

        store.set("finance_scenarios", "v1").unwrap();
        store.set("finance_scenarios", "v2").unwrap();
        assert_eq!(
            store.get("finance_scenarios").unwrap().as_deref(),
            Some("v2")
        );
    }

    #[test]
    fn file_store_remove_deletes_the_entry_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path().to_path_buf()).unwrap();

        store.set("finance_data", "x").unwrap();
        store.remove("finance_data").unwrap();
        assert!(store.get("finance_data").unwrap().is_none());
        assert!(!dir.path().join("finance_data.json").exists());
    }

    #[test]
    fn second_open_on_locked_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let _held = FileKvStore::open(dir.path().to_path_buf()).unwrap();

        let second = FileKvStore::open(dir.path().to_path_buf());
        assert!(matches!(second, Err(StorageError::Locked(_))));
    }
}
