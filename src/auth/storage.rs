//! # Session Storage Backends
//!
//! Two independent key-value backends hold the persisted session: a durable
//! one that survives restarts and an ephemeral one that lives as long as the
//! process. [`StorageKind`] picks one of them explicitly.

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::StorageError;

/// A synchronous string key-value store.
pub trait Storage: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Which backend holds the live session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Durable,
    Ephemeral,
}

impl StorageKind {
    /// "Remember me" selects the durable backend.
    pub fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            StorageKind::Durable
        } else {
            StorageKind::Ephemeral
        }
    }

    pub fn other(self) -> Self {
        match self {
            StorageKind::Durable => StorageKind::Ephemeral,
            StorageKind::Ephemeral => StorageKind::Durable,
        }
    }

    pub fn remember_me(self) -> bool {
        self == StorageKind::Durable
    }
}

/// The pair of backends shared by every session manager of an application.
#[derive(Debug, Clone)]
pub struct SessionStores {
    durable: Arc<dyn Storage>,
    ephemeral: Arc<dyn Storage>,
}

impl SessionStores {
    pub fn new(durable: Arc<dyn Storage>, ephemeral: Arc<dyn Storage>) -> Self {
        Self { durable, ephemeral }
    }

    /// Both backends in memory.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryStorage::new()),
        )
    }

    pub fn get(&self, kind: StorageKind) -> &Arc<dyn Storage> {
        match kind {
            StorageKind::Durable => &self.durable,
            StorageKind::Ephemeral => &self.ephemeral,
        }
    }

    pub fn durable(&self) -> &Arc<dyn Storage> {
        &self.durable
    }

    pub fn ephemeral(&self) -> &Arc<dyn Storage> {
        &self.ephemeral
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// Durable backend persisted as a JSON object in a single file.
///
/// Writes go to a sibling temp file which is then renamed over the target.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        FileStorage::new(&path).set("k", "v").unwrap();
        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));

        reopened.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(reopened.get("k").unwrap(), None);
    }

    #[test]
    fn file_storage_remove_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join("session.json"));
        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();
        storage.remove("a").unwrap();
        assert_eq!(storage.get("a").unwrap(), None);
        assert_eq!(storage.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn kind_follows_remember_me() {
        assert_eq!(StorageKind::from_remember_me(true), StorageKind::Durable);
        assert_eq!(StorageKind::from_remember_me(false), StorageKind::Ephemeral);
        assert_eq!(StorageKind::Durable.other(), StorageKind::Ephemeral);
    }
}
