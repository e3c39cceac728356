//! Durable backends for the layout cache.
//!
//! A backend stores one opaque JSON document. `read` returns `None` when
//! nothing has been stored yet.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::StoreError;

pub trait LayoutStorage: Send + Sync {
    fn read(&self) -> Result<Option<String>, StoreError>;
    fn write(&self, data: &str) -> Result<(), StoreError>;
}

/// JSON file on disk
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LayoutStorage for FileStorage {
    fn read(&self) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, data: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

/// In-process storage; clones share the same document.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: impl Into<String>) -> Self {
        Self {
            data: Arc::new(Mutex::new(Some(data.into()))),
        }
    }

    /// Current document, if any.
    pub fn snapshot(&self) -> Option<String> {
        self.data.lock().ok().and_then(|d| d.clone())
    }
}

impl LayoutStorage for MemoryStorage {
    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.snapshot())
    }

    fn write(&self, data: &str) -> Result<(), StoreError> {
        if let Ok(mut guard) = self.data.lock() {
            *guard = Some(data.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("layouts.json"));
        assert!(storage.read().unwrap().is_none());
    }

    #[test]
    fn file_storage_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested/state/layouts.json"));
        storage.write("{}").unwrap();
        assert_eq!(storage.read().unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn memory_storage_clones_share_data() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.write("{\"full\":{}}").unwrap();
        assert_eq!(other.snapshot().as_deref(), Some("{\"full\":{}}"));
    }
}
