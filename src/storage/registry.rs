//! Registry of named storage backends

use super::backend::StorageBackend;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Label reported for a cache whose storage is not registered
pub const UNKNOWN_STORAGE_LABEL: &str = "Unknown";

/// A storage backend registered under a logical name
#[derive(Clone)]
pub struct DefinedStorage {
    pub name: String,
    pub label: String,
    pub backend: Arc<dyn StorageBackend>,
}

impl fmt::Debug for DefinedStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinedStorage")
            .field("name", &self.name)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Thread-safe name → backend lookup shared by every cache
#[derive(Default)]
pub struct StorageRegistry {
    storages: RwLock<HashMap<String, DefinedStorage>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, replacing any previous definition with the same name
    pub fn register(
        &self,
        name: impl Into<String>,
        label: impl Into<String>,
        backend: Arc<dyn StorageBackend>,
    ) {
        let name = name.into();
        tracing::debug!(storage = %name, "Registering storage backend");
        self.storages.write().insert(
            name.clone(),
            DefinedStorage {
                name,
                label: label.into(),
                backend,
            },
        );
    }

    /// Remove a definition. Returns true if it existed.
    pub fn unregister(&self, name: &str) -> bool {
        self.storages.write().remove(name).is_some()
    }

    /// Resolve a logical name
    pub fn get(&self, name: &str) -> Option<DefinedStorage> {
        self.storages.read().get(name).cloned()
    }

    /// Sorted names of every registered storage
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.storages.read().keys().cloned().collect();
        names.sort();
        names
    }
}
