// Key/value persistence surface - flat key -> JSON string records

use log::warn;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Storage error types
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("No data directory available on this platform")]
    NoDataDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat key -> JSON-string store.
///
/// Implementations normalize transient I/O failures instead of raising them:
/// `get` returns `None` for anything unreadable, `set`/`remove` log and
/// continue. Callers treat a missing record as "use defaults".
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Durable store keeping one JSON file per key inside an app data directory
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at an explicit directory (created if missing)
    pub fn new(root: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Create a store under the platform data directory, e.g.
    /// `~/.local/share/<app_name>` on Linux
    pub fn in_data_dir(app_name: &str) -> Result<Self, StorageError> {
        let base = dirs::data_dir().ok_or(StorageError::NoDataDir)?;
        Self::new(base.join(app_name))
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are fixed identifiers, but anything unsafe for a filename is
        // mapped to '_' so a key can never escape the store directory.
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.json", safe))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read record '{}': {}", key, e);
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: String) {
        if let Err(e) = fs::write(self.path_for(key), value) {
            warn!("Failed to write record '{}': {}", key, e);
        }
    }

    fn remove(&mut self, key: &str) {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove record '{}': {}", key, e),
        }
    }
}
