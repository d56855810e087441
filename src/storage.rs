//! Key-value persistence for recent-topic history.
//!
//! History survives restarts through a [`KeyValueStore`]. Reading is
//! forgiving in the same way the rest of the engine treats local state: a
//! missing key, an unreadable file, or a corrupt value all load as empty
//! history and log a warning. Storage can slow the user down but never stop
//! them.
//!
//! ## Stored format
//!
//! The value under the history key is a JSON array of strings, most recent
//! first:
//!
//! ```json
//! ["Hogwarts", "CRISPR", "Game Theory"]
//! ```
//!
//! Non-string and blank entries are dropped on load; de-duplication and the
//! capacity bound are re-applied.

use crate::navigation::History;
use crate::types::Topic;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_STORAGE_KEY: &str = "aiwiki:history";

/// File name of the store inside the state directory.
const STORE_FILENAME: &str = "storage.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

/// A single JSON object file under a state directory.
///
/// The file is re-read on every access so several processes sharing a state
/// directory see each other's writes. Last writer wins.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(STORE_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Anything unreadable is treated as an empty store.
    fn load(&self) -> BTreeMap<String, String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return BTreeMap::new(),
        };
        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt store");
                BTreeMap::new()
            }
        }
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.load();
        values.insert(key.to_string(), value.to_string());
        self.write(&values)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut values = self.load();
        if values.remove(key).is_some() {
            self.write(&values)?;
        }
        Ok(())
    }
}

// ============================================================================
// History persistence
// ============================================================================

pub fn load_history<S: KeyValueStore + ?Sized>(store: &S, key: &str, capacity: usize) -> History {
    let Some(raw) = store.get(key) else {
        return History::new(capacity);
    };
    let entries = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            warn!(key, "stored history is not a list, starting empty");
            return History::new(capacity);
        }
        Err(e) => {
            warn!(key, error = %e, "stored history is corrupt, starting empty");
            return History::new(capacity);
        }
    };
    let topics = entries
        .iter()
        .filter_map(Value::as_str)
        .filter_map(Topic::parse);
    History::from_entries(topics, capacity)
}

pub fn save_history<S: KeyValueStore + ?Sized>(
    store: &mut S,
    key: &str,
    history: &History,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(history.entries())?;
    store.set(key, &json)
}

pub fn clear_history<S: KeyValueStore + ?Sized>(store: &mut S, key: &str) -> Result<(), StorageError> {
    store.remove(key)
}
