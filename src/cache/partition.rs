//! Partitions: filename namespaces inside a cache

use super::bounded::Cache;
use super::file::CacheFile;
use super::writer::FileWriter;
use super::{combined_key, file_lock_name, CacheContext, LockPolicy};
use crate::error::CacheError;
use crate::events::CacheEvent;
use crate::storage::OpenMode;
use crate::store::PartitionRecord;
use bytes::Bytes;
use chrono::Utc;
use std::fmt;

#[derive(Clone)]
pub struct Partition {
    cache: Cache,
    record: PartitionRecord,
}

impl Partition {
    pub(crate) fn new(cache: Cache, record: PartitionRecord) -> Self {
        Self { cache, record }
    }

    pub fn id(&self) -> u64 {
        self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn record(&self) -> &PartitionRecord {
        &self.record
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub(crate) fn context(&self) -> &CacheContext {
        self.cache.context()
    }

    /// Storage key for `filename` in this partition
    pub fn full_filename(&self, filename: &str) -> String {
        combined_key(&self.record.name, filename)
    }

    pub fn file_lock_name(&self, filename: &str) -> String {
        file_lock_name(self.cache.id(), self.record.id, filename)
    }

    pub async fn get_file(&self, filename: &str) -> Result<CacheFile, CacheError> {
        match self.context().store.get_file(self.record.id, filename).await? {
            Some(record) => Ok(CacheFile::new(self.clone(), record)),
            None => Err(CacheError::NotFound(format!(
                "file {:?} in partition {:?}",
                filename, self.record.name
            ))),
        }
    }

    pub async fn get_files(&self) -> Result<Vec<CacheFile>, CacheError> {
        let records = self.context().store.list_files(self.record.id).await?;
        Ok(records
            .into_iter()
            .map(|record| CacheFile::new(self.clone(), record))
            .collect())
    }

    /// Delete every file of the partition, each under its own lock
    pub async fn purge(&self) -> Result<(), CacheError> {
        for file in self.get_files().await? {
            file.delete().await?;
        }

        tracing::info!(cache = %self.cache.name(), partition = %self.record.name, "Purged cache partition");
        self.context().events.notify(CacheEvent::PartitionPurged {
            cache_id: self.cache.id(),
            partition_id: self.record.id,
            name: self.record.name.clone(),
        });
        Ok(())
    }

    /// Purge, then remove the partition record
    pub async fn delete(self) -> Result<(), CacheError> {
        self.purge().await?;
        self.context().store.delete_partition(self.record.id).await?;
        Ok(())
    }

    /// Start writing a new file.
    ///
    /// The file lock is held until the returned writer is committed, aborted
    /// or dropped. The cache is pruned before any byte is stored, and a
    /// previous file with the same name is replaced. If anything fails before
    /// the commit completes, the new record and its stored object are removed.
    pub async fn create_file(&self, filename: &str) -> Result<FileWriter, CacheError> {
        let lock_name = self.file_lock_name(filename);
        tracing::debug!(lock = %lock_name, "Trying to acquire lock");
        let lock = match self.context().locks.acquire(&lock_name).await {
            Ok(lock) => lock,
            Err(err) => {
                tracing::debug!(lock = %lock_name, error = %err, "Unable to obtain lock");
                return Err(err.into());
            }
        };
        tracing::debug!(lock = %lock_name, "Acquired lock");

        // Prune may pick the previous version of this file; it runs under our lock
        self.cache.prune_with(Some(&lock_name)).await?;

        // The previous version goes through the delete path first, so its
        // record never outlives its bytes
        self.remove_previous(filename).await?;

        // Write mode doesn't create objects, so store an empty one first.
        // Stray bytes with no record are dropped as well.
        let storage = self.cache.storage()?;
        let full_filename = self.full_filename(filename);
        storage.delete(&full_filename).await?;
        storage.save(&full_filename, Bytes::new()).await?;

        let created = self
            .context()
            .store
            .create_file(self.record.id, filename, Utc::now())
            .await;
        let record = match created {
            Ok(record) => record,
            Err(err) => {
                tracing::error!(
                    file = %full_filename,
                    error = %err,
                    "Unexpected exception while trying to save new cache file"
                );
                // No record to go through, remove the placeholder directly
                if let Err(cleanup) = storage.delete(&full_filename).await {
                    tracing::error!(file = %full_filename, error = %cleanup, "Failed to remove placeholder");
                }
                return Err(err.into());
            }
        };

        let mut file = CacheFile::new(self.clone(), record);
        if let Err(err) = file.open_with(OpenMode::Write, LockPolicy::AlreadyHeld).await {
            tracing::error!(
                file = %full_filename,
                error = %err,
                "Unexpected exception while trying to save new cache file"
            );
            FileWriter::discard(file).await;
            return Err(err);
        }

        Ok(FileWriter::new(lock, file))
    }

    /// Create a file holding `content` in one call
    pub async fn create_file_with_content(
        &self,
        filename: &str,
        content: impl AsRef<[u8]>,
    ) -> Result<CacheFile, CacheError> {
        let mut writer = self.create_file(filename).await?;
        writer.write(content.as_ref()).await?;
        writer.commit().await
    }

    /// Delete the current file named `filename`, bytes then record.
    /// The caller holds the file lock.
    async fn remove_previous(&self, filename: &str) -> Result<(), CacheError> {
        if let Some(previous) = self.context().store.get_file(self.record.id, filename).await? {
            tracing::debug!(file = %self.full_filename(filename), "Replacing previous cache file");
            CacheFile::new(self.clone(), previous)
                .delete_with(LockPolicy::AlreadyHeld)
                .await?;
        }
        Ok(())
    }
}

impl fmt::Debug for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("record", &self.record)
            .field("cache", &self.cache.name())
            .finish()
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.cache.name(), self.record.name)
    }
}
