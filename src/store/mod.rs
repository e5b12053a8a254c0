//! Metadata persistence
//!
//! The [`MetadataStore`] trait is the repository port for cache, partition and
//! file records. It enforces the uniqueness rules the cache relies on:
//! - cache `name`
//! - partition `(cache_id, name)`
//! - file `(partition_id, filename)`
//!
//! [`MemoryMetadataStore`] is the in-process implementation, optionally
//! snapshotted to a JSON file.

mod error;
mod memory;
mod records;

pub use self::error::StoreError;
pub use self::memory::MemoryMetadataStore;
pub use self::records::{CacheRecord, FileRecord, PartitionRecord};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a cache record. Fails with `Conflict` if the name is taken.
    async fn create_cache(&self, name: &str, maximum_size: u64) -> Result<CacheRecord, StoreError>;

    /// Persist changes to an existing cache record
    async fn update_cache(&self, record: &CacheRecord) -> Result<(), StoreError>;

    async fn get_cache(&self, id: u64) -> Result<Option<CacheRecord>, StoreError>;

    async fn get_cache_by_name(&self, name: &str) -> Result<Option<CacheRecord>, StoreError>;

    async fn list_caches(&self) -> Result<Vec<CacheRecord>, StoreError>;

    /// Delete a cache record together with its partition and file records
    async fn delete_cache(&self, id: u64) -> Result<(), StoreError>;

    async fn create_partition(&self, cache_id: u64, name: &str) -> Result<PartitionRecord, StoreError>;

    async fn get_partition(&self, cache_id: u64, name: &str) -> Result<Option<PartitionRecord>, StoreError>;

    async fn get_partition_by_id(&self, id: u64) -> Result<Option<PartitionRecord>, StoreError>;

    async fn list_partitions(&self, cache_id: u64) -> Result<Vec<PartitionRecord>, StoreError>;

    /// Delete a partition record together with its file records
    async fn delete_partition(&self, id: u64) -> Result<(), StoreError>;

    /// Insert a file record with `file_size` 0.
    /// Fails with `Conflict` if the partition already has `filename`.
    async fn create_file(
        &self,
        partition_id: u64,
        filename: &str,
        created_at: DateTime<Utc>,
    ) -> Result<FileRecord, StoreError>;

    async fn get_file(&self, partition_id: u64, filename: &str) -> Result<Option<FileRecord>, StoreError>;

    async fn list_files(&self, partition_id: u64) -> Result<Vec<FileRecord>, StoreError>;

    /// Every file of every partition of the cache
    async fn list_cache_files(&self, cache_id: u64) -> Result<Vec<FileRecord>, StoreError>;

    async fn update_file_size(&self, id: u64, file_size: u64) -> Result<(), StoreError>;

    /// Delete a file record. Deleting an absent record is not an error.
    async fn delete_file(&self, id: u64) -> Result<(), StoreError>;

    /// File with the smallest `created_at` across all partitions of the cache
    async fn earliest_file(&self, cache_id: u64) -> Result<Option<FileRecord>, StoreError>;

    /// Sum of `file_size` across all partitions of the cache
    async fn total_size(&self, cache_id: u64) -> Result<u64, StoreError>;

    /// Fetch a partition, creating it on first use
    async fn get_or_create_partition(&self, cache_id: u64, name: &str) -> Result<PartitionRecord, StoreError> {
        if let Some(partition) = self.get_partition(cache_id, name).await? {
            return Ok(partition);
        }
        match self.create_partition(cache_id, name).await {
            Ok(partition) => Ok(partition),
            // Lost a creation race, the winner's record is good
            Err(StoreError::Conflict { .. }) => self
                .get_partition(cache_id, name)
                .await?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "partition",
                    key: name.to_string(),
                }),
            Err(e) => Err(e),
        }
    }
}
