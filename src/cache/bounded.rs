//! The size-bounded cache entity

use super::file::CacheFile;
use super::partition::Partition;
use super::usage::CacheUsage;
use super::{CacheContext, LockPolicy};
use crate::error::CacheError;
use crate::events::CacheEvent;
use crate::storage::{DefinedStorage, StorageBackend, UNKNOWN_STORAGE_LABEL};
use crate::store::CacheRecord;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named cache bound to one defined storage.
///
/// Clones share the storage memo; partitions and files handed out by a cache
/// hold a clone of it.
#[derive(Clone)]
pub struct Cache {
    ctx: Arc<CacheContext>,
    record: CacheRecord,
    /// Resolved storage, memoised on first successful lookup
    storage: Arc<Mutex<Option<DefinedStorage>>>,
}

impl Cache {
    /// Persist a new cache, notify, then prune
    pub async fn create(
        ctx: Arc<CacheContext>,
        name: &str,
        maximum_size: u64,
    ) -> Result<Self, CacheError> {
        validate_maximum_size(maximum_size)?;
        let record = ctx.store.create_cache(name, maximum_size).await?;
        let cache = Self::from_record(ctx, record);

        tracing::info!(cache = %cache.name(), maximum_size, "Created cache");
        cache.ctx.events.notify(CacheEvent::CacheCreated {
            cache_id: cache.id(),
            name: cache.name().to_string(),
        });
        cache.prune().await?;
        Ok(cache)
    }

    pub fn from_record(ctx: Arc<CacheContext>, record: CacheRecord) -> Self {
        Self {
            ctx,
            record,
            storage: Arc::new(Mutex::new(None)),
        }
    }

    /// Load a persisted cache by its storage name
    pub async fn load(ctx: Arc<CacheContext>, name: &str) -> Result<Self, CacheError> {
        match ctx.store.get_cache_by_name(name).await? {
            Some(record) => Ok(Self::from_record(ctx, record)),
            None => Err(CacheError::NotFound(format!("cache {:?}", name))),
        }
    }

    pub fn id(&self) -> u64 {
        self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn maximum_size(&self) -> u64 {
        self.record.maximum_size
    }

    pub fn record(&self) -> &CacheRecord {
        &self.record
    }

    /// Change the size limit. Takes effect on [`save`](Self::save).
    pub fn set_maximum_size(&mut self, maximum_size: u64) {
        self.record.maximum_size = maximum_size;
    }

    pub(crate) fn context(&self) -> &CacheContext {
        &self.ctx
    }

    /// Persist edits, notify, then prune
    pub async fn save(&mut self) -> Result<(), CacheError> {
        validate_maximum_size(self.record.maximum_size)?;
        self.ctx.store.update_cache(&self.record).await?;

        tracing::info!(cache = %self.name(), maximum_size = self.record.maximum_size, "Edited cache");
        self.ctx.events.notify(CacheEvent::CacheEdited {
            cache_id: self.id(),
            name: self.name().to_string(),
        });
        self.prune().await
    }

    /// The registered storage for this cache, if any
    pub fn defined_storage(&self) -> Option<DefinedStorage> {
        let mut memo = self.storage.lock();
        if let Some(storage) = memo.as_ref() {
            return Some(storage.clone());
        }

        let resolved = self.ctx.storages.get(&self.record.name);
        if resolved.is_some() {
            *memo = resolved.clone();
        }
        resolved
    }

    pub fn storage(&self) -> Result<Arc<dyn StorageBackend>, CacheError> {
        self.defined_storage()
            .map(|storage| storage.backend)
            .ok_or_else(|| CacheError::StorageUnavailable(self.record.name.clone()))
    }

    /// Registry label of the storage, `"Unknown"` if it is not registered
    pub fn label(&self) -> String {
        self.defined_storage()
            .map(|storage| storage.label)
            .unwrap_or_else(|| UNKNOWN_STORAGE_LABEL.to_string())
    }

    /// Forget the memoised storage so the next access resolves it again
    pub fn invalidate_storage(&self) {
        self.storage.lock().take();
    }

    pub async fn get_total_size(&self) -> Result<u64, CacheError> {
        Ok(self.ctx.store.total_size(self.record.id).await?)
    }

    pub async fn get_partitions(&self) -> Result<Vec<Partition>, CacheError> {
        let records = self.ctx.store.list_partitions(self.record.id).await?;
        Ok(records
            .into_iter()
            .map(|record| Partition::new(self.clone(), record))
            .collect())
    }

    pub async fn get_partition(&self, name: &str) -> Result<Partition, CacheError> {
        match self.ctx.store.get_partition(self.record.id, name).await? {
            Some(record) => Ok(Partition::new(self.clone(), record)),
            None => Err(CacheError::NotFound(format!(
                "partition {:?} in cache {:?}",
                name, self.record.name
            ))),
        }
    }

    pub async fn get_or_create_partition(&self, name: &str) -> Result<Partition, CacheError> {
        let record = self
            .ctx
            .store
            .get_or_create_partition(self.record.id, name)
            .await?;
        Ok(Partition::new(self.clone(), record))
    }

    /// Every file of every partition
    pub async fn get_files(&self) -> Result<Vec<CacheFile>, CacheError> {
        let partitions: HashMap<u64, Partition> = self
            .get_partitions()
            .await?
            .into_iter()
            .map(|partition| (partition.id(), partition))
            .collect();

        let records = self.ctx.store.list_cache_files(self.record.id).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| {
                let partition = partitions.get(&record.partition_id)?.clone();
                Some(CacheFile::new(partition, record))
            })
            .collect())
    }

    /// Delete the oldest files, cache-wide, until the cache fits its maximum
    /// size.
    ///
    /// A file whose lock can't be obtained counts as a failed attempt and the
    /// oldest file is selected again. More than `maximum_prune_attempts`
    /// failures end with [`CacheError::PruneExhausted`].
    pub async fn prune(&self) -> Result<(), CacheError> {
        self.prune_with(None).await
    }

    /// Prune while the caller holds the file lock named `held`. A file
    /// guarded by that lock is deleted without acquiring it again.
    pub(crate) async fn prune_with(&self, held: Option<&str>) -> Result<(), CacheError> {
        let store = &self.ctx.store;
        // The persisted limit wins over unsaved edits
        let maximum_size = match store.get_cache(self.record.id).await? {
            Some(record) => record.maximum_size,
            None => self.record.maximum_size,
        };
        let mut failed_attempts: u32 = 0;

        loop {
            let total_size = store.total_size(self.record.id).await?;
            if total_size <= maximum_size {
                return Ok(());
            }

            let Some(record) = store.earliest_file(self.record.id).await? else {
                return Ok(());
            };

            let Some(partition) = store.get_partition_by_id(record.partition_id).await? else {
                // Partition went away under us, its files went with it
                store.delete_file(record.id).await?;
                continue;
            };

            let file = CacheFile::new(Partition::new(self.clone(), partition), record);
            let full_filename = file.full_filename();
            let file_size = file.file_size();
            let policy = if held == Some(file.lock_name().as_str()) {
                LockPolicy::AlreadyHeld
            } else {
                LockPolicy::Acquire
            };

            match file.delete_with(policy).await {
                Ok(()) => {
                    tracing::info!(
                        cache = %self.name(),
                        file = %full_filename,
                        file_size,
                        total_size,
                        maximum_size,
                        "Pruned cache file"
                    );
                }
                Err(CacheError::LockUnavailable(err)) => {
                    failed_attempts += 1;
                    tracing::warn!(
                        cache = %self.name(),
                        file = %full_filename,
                        error = %err,
                        failed_attempts,
                        "Unable to lock cache file for pruning"
                    );
                    if failed_attempts > self.ctx.maximum_prune_attempts {
                        return Err(CacheError::PruneExhausted {
                            cache: self.name().to_string(),
                            attempts: failed_attempts,
                        });
                    }
                    tokio::task::yield_now().await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Delete the files of every partition and notify.
    ///
    /// Nothing happens when the storage is not registered, since the bytes
    /// could not be removed and would be orphaned.
    pub async fn purge(&self) -> Result<(), CacheError> {
        if self.defined_storage().is_none() {
            tracing::warn!(cache = %self.name(), "Storage not defined, skipping cache purge");
            return Ok(());
        }

        for partition in self.get_partitions().await? {
            partition.purge().await?;
        }

        tracing::info!(cache = %self.name(), "Purged cache");
        self.ctx.events.notify(CacheEvent::CachePurged {
            cache_id: self.id(),
            name: self.name().to_string(),
        });
        Ok(())
    }

    /// Purge, then remove the cache record. Returns false when skipped
    /// because the storage is not registered.
    pub async fn delete(self) -> Result<bool, CacheError> {
        if self.defined_storage().is_none() {
            tracing::warn!(cache = %self.name(), "Storage not defined, skipping cache delete");
            return Ok(false);
        }

        self.purge().await?;
        self.ctx.store.delete_cache(self.record.id).await?;
        tracing::info!(cache = %self.name(), "Deleted cache");
        Ok(true)
    }

    pub async fn usage(&self) -> Result<CacheUsage, CacheError> {
        let store = &self.ctx.store;
        let partitions = store.list_partitions(self.record.id).await?;
        let files = store.list_cache_files(self.record.id).await?;

        Ok(CacheUsage {
            total_size: files.iter().map(|file| file.file_size).sum(),
            maximum_size: self.record.maximum_size,
            partition_count: partitions.len(),
            file_count: files.len(),
        })
    }
}

fn validate_maximum_size(maximum_size: u64) -> Result<(), CacheError> {
    if maximum_size == 0 {
        return Err(CacheError::Config(
            "maximum_size must be at least 1 byte".to_string(),
        ));
    }
    Ok(())
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
