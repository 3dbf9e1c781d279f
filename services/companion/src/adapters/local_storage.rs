//! services/companion/src/adapters/local_storage.rs
//!
//! Concrete implementations of the `KeyValueStore` port: a directory of
//! one-file-per-key values on disk, and an in-memory map.

use calmmind_core::ports::{KeyValueStore, PortError, PortResult};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::error;

/// Key of the persisted model preference, which overrides the configured model.
pub const PREFERRED_MODEL_KEY: &str = "calmmind_preferred_model";

/// Reads the persisted model preference, if any. Substrate failures read as none.
pub fn preferred_model(storage: &dyn KeyValueStore) -> Option<String> {
    match storage.get_item(PREFERRED_MODEL_KEY) {
        Ok(value) => value
            .map(|model| model.trim().to_string())
            .filter(|model| !model.is_empty()),
        Err(e) => {
            error!("Error loading preferred model: {}", e);
            None
        }
    }
}

//=========================================================================================
// File-backed Storage
//=========================================================================================

/// Stores each key as `<dir>/<key>.json`. Writes go through a temp file and a rename.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates a `FileStorage`, creating `dir` if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> PortResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            PortError::Unexpected(format!("Cannot create storage dir {:?}: {}", dir, e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_stem))
    }
}

impl KeyValueStore for FileStorage {
    fn get_item(&self, key: &str) -> PortResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PortError::Unexpected(format!("Failed to read '{}': {}", key, e))),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> PortResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| PortError::Unexpected(format!("Failed to write '{}': {}", key, e)))
    }

    fn remove_item(&self, key: &str) -> PortResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(format!("Failed to remove '{}': {}", key, e))),
        }
    }
}

//=========================================================================================
// In-memory Storage
//=========================================================================================

/// A process-local map. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| PortError::Unexpected("memory storage lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> PortResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> PortResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
