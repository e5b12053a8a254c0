//! In-memory metadata store with JSON snapshots

use super::error::StoreError;
use super::records::{CacheRecord, FileRecord, PartitionRecord};
use super::MetadataStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct State {
    next_id: u64,
    caches: BTreeMap<u64, CacheRecord>,
    partitions: BTreeMap<u64, PartitionRecord>,
    files: BTreeMap<u64, FileRecord>,
}

impl State {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn partition_ids(&self, cache_id: u64) -> Vec<u64> {
        self.partitions
            .values()
            .filter(|p| p.cache_id == cache_id)
            .map(|p| p.id)
            .collect()
    }

    fn cache_files(&self, cache_id: u64) -> impl Iterator<Item = &FileRecord> {
        let partition_ids = self.partition_ids(cache_id);
        self.files
            .values()
            .filter(move |f| partition_ids.contains(&f.partition_id))
    }

    fn remove_partition(&mut self, id: u64) {
        self.partitions.remove(&id);
        self.files.retain(|_, f| f.partition_id != id);
    }
}

/// Serializable snapshot of the store
#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    state: State,
}

/// Thread-safe in-memory implementation of [`MetadataStore`]
#[derive(Default)]
pub struct MemoryMetadataStore {
    state: RwLock<State>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of file records across all caches
    pub fn file_count(&self) -> usize {
        self.state.read().files.len()
    }

    /// Write a JSON snapshot of every record
    pub async fn save_to_file(&self, path: &Path) -> Result<(), StoreError> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            state: self.state.read().clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, path).await?;

        Ok(())
    }

    /// Load a snapshot written by [`save_to_file`](Self::save_to_file).
    ///
    /// A missing file yields an empty store. So does an unreadable snapshot,
    /// after logging a warning.
    pub async fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = match serde_json::from_slice(&data) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse metadata snapshot. Starting with empty store."
                );
                return Ok(Self::new());
            }
        };

        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(
                path = %path.display(),
                version = snapshot.version,
                "Unsupported metadata snapshot version. Starting with empty store."
            );
            return Ok(Self::new());
        }

        Ok(Self {
            state: RwLock::new(snapshot.state),
        })
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn create_cache(&self, name: &str, maximum_size: u64) -> Result<CacheRecord, StoreError> {
        let mut state = self.state.write();
        if state.caches.values().any(|c| c.name == name) {
            return Err(StoreError::Conflict {
                entity: "cache",
                key: name.to_string(),
            });
        }

        let record = CacheRecord {
            id: state.allocate_id(),
            name: name.to_string(),
            maximum_size,
        };
        state.caches.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_cache(&self, record: &CacheRecord) -> Result<(), StoreError> {
        let mut state = self.state.write();
        if state
            .caches
            .values()
            .any(|c| c.name == record.name && c.id != record.id)
        {
            return Err(StoreError::Conflict {
                entity: "cache",
                key: record.name.clone(),
            });
        }

        match state.caches.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "cache",
                key: record.id.to_string(),
            }),
        }
    }

    async fn get_cache(&self, id: u64) -> Result<Option<CacheRecord>, StoreError> {
        Ok(self.state.read().caches.get(&id).cloned())
    }

    async fn get_cache_by_name(&self, name: &str) -> Result<Option<CacheRecord>, StoreError> {
        Ok(self
            .state
            .read()
            .caches
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn list_caches(&self) -> Result<Vec<CacheRecord>, StoreError> {
        Ok(self.state.read().caches.values().cloned().collect())
    }

    async fn delete_cache(&self, id: u64) -> Result<(), StoreError> {
        let mut state = self.state.write();
        for partition_id in state.partition_ids(id) {
            state.remove_partition(partition_id);
        }
        state.caches.remove(&id);
        Ok(())
    }

    async fn create_partition(&self, cache_id: u64, name: &str) -> Result<PartitionRecord, StoreError> {
        let mut state = self.state.write();
        if !state.caches.contains_key(&cache_id) {
            return Err(StoreError::NotFound {
                entity: "cache",
                key: cache_id.to_string(),
            });
        }
        if state
            .partitions
            .values()
            .any(|p| p.cache_id == cache_id && p.name == name)
        {
            return Err(StoreError::Conflict {
                entity: "partition",
                key: name.to_string(),
            });
        }

        let record = PartitionRecord {
            id: state.allocate_id(),
            cache_id,
            name: name.to_string(),
        };
        state.partitions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_partition(&self, cache_id: u64, name: &str) -> Result<Option<PartitionRecord>, StoreError> {
        Ok(self
            .state
            .read()
            .partitions
            .values()
            .find(|p| p.cache_id == cache_id && p.name == name)
            .cloned())
    }

    async fn get_partition_by_id(&self, id: u64) -> Result<Option<PartitionRecord>, StoreError> {
        Ok(self.state.read().partitions.get(&id).cloned())
    }

    async fn list_partitions(&self, cache_id: u64) -> Result<Vec<PartitionRecord>, StoreError> {
        Ok(self
            .state
            .read()
            .partitions
            .values()
            .filter(|p| p.cache_id == cache_id)
            .cloned()
            .collect())
    }

    async fn delete_partition(&self, id: u64) -> Result<(), StoreError> {
        self.state.write().remove_partition(id);
        Ok(())
    }

    async fn create_file(
        &self,
        partition_id: u64,
        filename: &str,
        created_at: DateTime<Utc>,
    ) -> Result<FileRecord, StoreError> {
        let mut state = self.state.write();
        if !state.partitions.contains_key(&partition_id) {
            return Err(StoreError::NotFound {
                entity: "partition",
                key: partition_id.to_string(),
            });
        }
        if state
            .files
            .values()
            .any(|f| f.partition_id == partition_id && f.filename == filename)
        {
            return Err(StoreError::Conflict {
                entity: "file",
                key: filename.to_string(),
            });
        }

        let record = FileRecord {
            id: state.allocate_id(),
            partition_id,
            filename: filename.to_string(),
            created_at,
            file_size: 0,
        };
        state.files.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_file(&self, partition_id: u64, filename: &str) -> Result<Option<FileRecord>, StoreError> {
        Ok(self
            .state
            .read()
            .files
            .values()
            .find(|f| f.partition_id == partition_id && f.filename == filename)
            .cloned())
    }

    async fn list_files(&self, partition_id: u64) -> Result<Vec<FileRecord>, StoreError> {
        Ok(self
            .state
            .read()
            .files
            .values()
            .filter(|f| f.partition_id == partition_id)
            .cloned()
            .collect())
    }

    async fn list_cache_files(&self, cache_id: u64) -> Result<Vec<FileRecord>, StoreError> {
        Ok(self.state.read().cache_files(cache_id).cloned().collect())
    }

    async fn update_file_size(&self, id: u64, file_size: u64) -> Result<(), StoreError> {
        match self.state.write().files.get_mut(&id) {
            Some(file) => {
                file.file_size = file_size;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "file",
                key: id.to_string(),
            }),
        }
    }

    async fn delete_file(&self, id: u64) -> Result<(), StoreError> {
        self.state.write().files.remove(&id);
        Ok(())
    }

    async fn earliest_file(&self, cache_id: u64) -> Result<Option<FileRecord>, StoreError> {
        Ok(self
            .state
            .read()
            .cache_files(cache_id)
            .min_by_key(|f| (f.created_at, f.id))
            .cloned())
    }

    async fn total_size(&self, cache_id: u64) -> Result<u64, StoreError> {
        Ok(self
            .state
            .read()
            .cache_files(cache_id)
            .map(|f| f.file_size)
            .sum())
    }
}
