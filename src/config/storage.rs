//! Storage definitions.
//!
//! Each entry registers one named backend in the storage registry. Caches
//! refer to storages by `name`.

use serde::{Deserialize, Serialize};

/// Backend implementation for a defined storage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Files under `path`
    Filesystem,
    /// Process memory, lost on exit
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub name: String,
    /// Human readable label (default: the name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub backend: StorageKind,
    /// Root directory, required for filesystem storages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl StorageConfig {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Storage name cannot be empty".to_string());
        }
        if self.backend == StorageKind::Filesystem
            && self.path.as_deref().map_or(true, |p| p.trim().is_empty())
        {
            return Err(format!(
                "Storage '{}': path cannot be empty for filesystem backend",
                self.name
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filesystem_storage_requires_path() {
        let storage = StorageConfig {
            name: "thumbnails".to_string(),
            label: None,
            backend: StorageKind::Filesystem,
            path: None,
        };
        assert!(storage.validate().unwrap_err().contains("path cannot be empty"));

        let storage = StorageConfig {
            path: Some("/var/cache/kura".to_string()),
            ..storage
        };
        assert!(storage.validate().is_ok());
    }

    #[test]
    fn test_memory_storage_needs_no_path() {
        let storage = StorageConfig {
            name: "scratch".to_string(),
            label: Some("Scratch space".to_string()),
            backend: StorageKind::Memory,
            path: None,
        };
        assert!(storage.validate().is_ok());
        assert_eq!(storage.label(), "Scratch space");
    }
}
