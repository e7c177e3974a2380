//! Key-value backends for the persisted session.
//!
//! Values are opaque strings, the same shape a browser's local storage holds.
//! The file backend keeps all entries in one JSON object and replaces the
//! file atomically on every mutation.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Read,
    Write,
    Remove,
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageOp::Read => write!(f, "read"),
            StorageOp::Write => write!(f, "write"),
            StorageOp::Remove => write!(f, "remove"),
        }
    }
}

/// A persisted read or write failed (disk full, permissions, corrupt file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    pub op: StorageOp,
    pub message: String,
}

impl StorageError {
    pub fn new(op: StorageOp, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }

    fn io(op: StorageOp, path: &Path, err: &io::Error) -> Self {
        Self::new(op, format!("{}: {err}", path.display()))
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "storage {} failed: {}", self.op, self.message)
    }
}

impl std::error::Error for StorageError {}

/// String key-value store backing a [`SessionStore`](super::SessionStore).
///
/// `set_many` must be all-or-nothing: either every entry is visible
/// afterwards or none of them changed.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key is absent.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes all entries in a single step.
    ///
    /// # Errors
    /// Returns an error if nothing was written.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

    /// Removes a key. Removing an absent key is a no-op.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be updated.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// # Errors
    /// Returns an error if the value was not written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_many(&[(key, value)])
    }
}

fn poisoned(op: StorageOp) -> StorageError {
    StorageError::new(op, "store lock poisoned")
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| poisoned(StorageOp::Read))?;
        Ok(entries.get(key).cloned())
    }

    fn set_many(&self, new_entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| poisoned(StorageOp::Write))?;
        for (key, value) in new_entries {
            entries.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| poisoned(StorageOp::Remove))?;
        entries.remove(key);
        Ok(())
    }
}

/// JSON-file store, written with restricted permissions (0600 on unix).
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within the process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_contents(&self, op: StorageOp) -> Result<Option<String>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents =
            fs::read_to_string(&self.path).map_err(|e| StorageError::io(op, &self.path, &e))?;
        Ok((!contents.trim().is_empty()).then_some(contents))
    }

    fn parse(&self, op: StorageOp, contents: &str) -> Result<HashMap<String, String>, StorageError> {
        serde_json::from_str(contents).map_err(|e| {
            StorageError::new(op, format!("{} is corrupt: {e}", self.path.display()))
        })
    }

    fn load(&self, op: StorageOp) -> Result<HashMap<String, String>, StorageError> {
        match self.read_contents(op)? {
            Some(contents) => self.parse(op, &contents),
            None => Ok(HashMap::new()),
        }
    }

    /// Loads for a write. A corrupt file is replaced rather than blocking a
    /// fresh login.
    fn load_for_update(&self, op: StorageOp) -> Result<HashMap<String, String>, StorageError> {
        let Some(contents) = self.read_contents(op)? else {
            return Ok(HashMap::new());
        };
        match self.parse(op, &contents) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                tracing::warn!(error = %err, "replacing corrupt session file");
                Ok(HashMap::new())
            }
        }
    }

    fn save(&self, op: StorageOp, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| StorageError::io(op, &parent, &e))?;

        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::new(op, format!("serialize session: {e}")))?;

        // NamedTempFile is created 0600 on unix; the rename makes the swap atomic.
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| StorageError::io(op, &parent, &e))?;
        tmp.write_all(contents.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StorageError::io(op, tmp.path(), &e))?;
        tmp.persist(&self.path)
            .map_err(|e| StorageError::io(op, &self.path, &e.error))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| poisoned(StorageOp::Read))?;
        Ok(self.load(StorageOp::Read)?.remove(key))
    }

    fn set_many(&self, new_entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| poisoned(StorageOp::Write))?;
        let mut entries = self.load_for_update(StorageOp::Write)?;
        for (key, value) in new_entries {
            entries.insert((*key).to_string(), (*value).to_string());
        }
        self.save(StorageOp::Write, &entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| poisoned(StorageOp::Remove))?;
        let mut entries = self.load_for_update(StorageOp::Remove)?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.save(StorageOp::Remove, &entries)
    }
}
