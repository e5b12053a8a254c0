//! In-memory storage (HashMap of objects), with failure simulation for tests

use super::backend::{OpenMode, StorageBackend, StorageObject};
use super::error::StorageError;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Faults {
    storage_full: bool,
    permission_denied: bool,
    delete_fails: bool,
}

/// Storage that keeps objects in memory
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
    faults: Arc<RwLock<Faults>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make saves and writes fail with `StorageFull`
    pub fn set_storage_full(&self, enabled: bool) {
        self.faults.write().storage_full = enabled;
    }

    /// Make every operation fail with a permission error
    pub fn set_permission_denied(&self, enabled: bool) {
        self.faults.write().permission_denied = enabled;
    }

    /// Make deletes fail while other operations keep working
    pub fn set_delete_fails(&self, enabled: bool) {
        self.faults.write().delete_fails = enabled;
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// Sorted names of all stored objects
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.objects.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Raw bytes stored under `name`, bypassing the backend API
    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.objects.read().get(name).cloned()
    }

    fn check_permission(&self) -> Result<(), StorageError> {
        if self.faults.read().permission_denied {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "Simulated permission denied",
            )));
        }
        Ok(())
    }

    fn check_capacity(&self, name: &str) -> Result<(), StorageError> {
        if self.faults.read().storage_full {
            return Err(StorageError::StorageFull(name.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn open(&self, name: &str, mode: OpenMode) -> Result<Box<dyn StorageObject>, StorageError> {
        self.check_permission()?;

        let contents = match mode {
            OpenMode::Read => self
                .objects
                .read()
                .get(name)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(name.to_string()))?,
            OpenMode::Write => {
                let mut objects = self.objects.write();
                let existing = objects
                    .get_mut(name)
                    .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
                *existing = Bytes::new();
                Bytes::new()
            }
        };

        Ok(Box::new(MemoryObject {
            storage: self.clone(),
            name: name.to_string(),
            mode,
            contents: Some(contents),
            pending: Vec::new(),
        }))
    }

    async fn save(&self, name: &str, content: Bytes) -> Result<(), StorageError> {
        self.check_permission()?;
        self.check_capacity(name)?;

        self.objects.write().insert(name.to_string(), content);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.check_permission()?;
        if self.faults.read().delete_fails {
            return Err(StorageError::BackendUnavailable);
        }

        self.objects.write().remove(name);
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        self.check_permission()?;
        Ok(self.objects.read().contains_key(name))
    }

    async fn size(&self, name: &str) -> Result<u64, StorageError> {
        self.check_permission()?;

        self.objects
            .read()
            .get(name)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }
}

/// Handle over an in-memory object. Writes are buffered and committed on close.
struct MemoryObject {
    storage: MemoryStorage,
    name: String,
    mode: OpenMode,
    /// `None` once closed
    contents: Option<Bytes>,
    pending: Vec<u8>,
}

#[async_trait]
impl StorageObject for MemoryObject {
    async fn read_to_end(&mut self) -> Result<Bytes, StorageError> {
        if self.mode != OpenMode::Read {
            return Err(StorageError::InvalidMode(self.name.clone(), "read"));
        }
        let name = &self.name;
        let contents = self
            .contents
            .take()
            .ok_or_else(|| StorageError::Closed(name.clone()))?;
        // Leave an exhausted reader behind
        self.contents = Some(Bytes::new());
        Ok(contents)
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if self.mode != OpenMode::Write {
            return Err(StorageError::InvalidMode(self.name.clone(), "write"));
        }
        if self.contents.is_none() {
            return Err(StorageError::Closed(self.name.clone()));
        }
        self.storage.check_permission()?;
        self.storage.check_capacity(&self.name)?;

        self.pending.extend_from_slice(data);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        if self.contents.take().is_none() {
            return Ok(());
        }
        if self.mode == OpenMode::Write {
            let data = Bytes::from(std::mem::take(&mut self.pending));
            let mut objects = self.storage.objects.write();
            // The object may have been deleted while the handle was open
            if let Some(existing) = objects.get_mut(&self.name) {
                *existing = data;
            }
        }
        Ok(())
    }
}
