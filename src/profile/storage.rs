//! Persistence port
//!
//! The store reads and writes the serialized profile as an opaque blob under a
//! single record key. Implementations decide where the blob lives.

use crate::error::StorageError;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Durable key/blob storage
pub trait ProfileStorage {
    /// Read the record, `None` when it was never written
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the record
    fn write(&mut self, key: &str, contents: &str) -> Result<(), StorageError>;

    /// Delete the record; deleting a missing record is not an error
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// One JSON file per record key inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage whose single record is exactly `path`
    pub fn for_file(path: &Path) -> (Self, String) {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let key = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        (Self::new(dir), key)
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl ProfileStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// In-process storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: HashMap<String, String>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with one record
    pub fn with_record(key: impl Into<String>, contents: impl Into<String>) -> Self {
        let mut storage = Self::default();
        storage.records.insert(key.into(), contents.into());
        storage
    }

    /// Storage that rejects every write (quota exhausted, read-only medium)
    pub fn read_only() -> Self {
        Self {
            records: HashMap::new(),
            fail_writes: true,
        }
    }
}

impl ProfileStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.records.get(key).cloned())
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable("storage is read-only".to_string()));
        }
        self.records.insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.records.remove(key);
        Ok(())
    }
}
