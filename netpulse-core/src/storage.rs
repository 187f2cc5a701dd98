// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Blob storage collaborators for result artifacts.
//!
//! The probe only needs a key/value blob interface; bucket and credential
//! resolution for real object stores stays outside this crate.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::error::StorageError;

/// Key/value blob storage keyed by bucket and object key.
pub trait BlobStore: Send + Sync {
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;
    fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
}

/// In-memory blob store. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    data: Arc<RwLock<HashMap<(String, String), Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut lock = self.data.write().unwrap();
        lock.insert((bucket.to_string(), key.to_string()), bytes.to_vec());
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let lock = self.data.read().unwrap();
        lock.get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let mut lock = self.data.write().unwrap();
        lock.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

/// Directory-backed blob store: a bucket is a subdirectory, a key a file.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StorageError::Io {
            context: "creating storage root",
            source: e,
        })?;
        Ok(Self { root })
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

impl BlobStore for DirBlobStore {
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let dir = self.root.join(bucket);
        fs::create_dir_all(&dir).map_err(|e| StorageError::Io {
            context: "creating bucket directory",
            source: e,
        })?;
        fs::write(self.object_path(bucket, key), bytes).map_err(|e| StorageError::Io {
            context: "writing blob",
            source: e,
        })
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(bucket, key);
        if !path.exists() {
            return Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        fs::read(path).map_err(|e| StorageError::Io {
            context: "reading blob",
            source: e,
        })
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.object_path(bucket, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io {
                context: "deleting blob",
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryBlobStore::new();
        store.put("bench", "a.csv", b"id,client_send").unwrap();
        assert_eq!(store.get("bench", "a.csv").unwrap(), b"id,client_send");

        store.delete("bench", "a.csv").unwrap();
        assert!(store.get("bench", "a.csv").is_err());
    }

    #[test]
    fn test_memory_store_clones_share_data() {
        let store = MemoryBlobStore::new();
        let handle = store.clone();
        store.put("bench", "a.csv", b"x").unwrap();
        assert_eq!(handle.get("bench", "a.csv").unwrap(), b"x");
    }

    #[test]
    fn test_dir_store_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = DirBlobStore::new(dir.path()).unwrap();

        store.put("bench", "a.csv", b"payload").unwrap();
        assert!(dir.path().join("bench").join("a.csv").exists());
        assert_eq!(store.get("bench", "a.csv").unwrap(), b"payload");

        store.delete("bench", "a.csv").unwrap();
        assert!(matches!(
            store.get("bench", "a.csv"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_dir_store_delete_missing_ok() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = DirBlobStore::new(dir.path()).unwrap();
        assert!(store.delete("bench", "missing.csv").is_ok());
    }
}
