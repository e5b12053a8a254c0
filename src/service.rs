//! Entry point for callers: caches by storage name

use crate::cache::{Cache, CacheContext, Partition};
use crate::config::{KuraConfig, StorageKind};
use crate::error::CacheError;
use crate::events::{EventSink, TracingEventSink};
use crate::lock::LocalLockManager;
use crate::storage::{FileSystemStorage, MemoryStorage, StorageBackend, StorageRegistry};
use crate::store::MemoryMetadataStore;
use std::sync::Arc;

/// Resolves, defines and purges caches over one shared context
#[derive(Clone)]
pub struct CacheService {
    ctx: Arc<CacheContext>,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService").finish_non_exhaustive()
    }
}

impl CacheService {
    pub fn new(ctx: Arc<CacheContext>) -> Self {
        Self { ctx }
    }

    /// Build the registry, lock manager, metadata store and event sink
    /// described by `config`. Caches are not defined until
    /// [`sync_from_config`](Self::sync_from_config).
    pub async fn from_config(config: &KuraConfig) -> Result<Self, CacheError> {
        config.validate().map_err(CacheError::Config)?;

        let storages = Arc::new(StorageRegistry::new());
        for storage in &config.storages {
            let backend: Arc<dyn StorageBackend> = match storage.backend {
                StorageKind::Memory => Arc::new(MemoryStorage::new()),
                StorageKind::Filesystem => {
                    // validate() guarantees a path for filesystem storages
                    let path = storage.path.as_deref().unwrap_or_default();
                    tokio::fs::create_dir_all(path).await.map_err(|e| {
                        CacheError::Config(format!(
                            "Storage '{}': cannot create directory {}: {}",
                            storage.name, path, e
                        ))
                    })?;
                    Arc::new(FileSystemStorage::new(path))
                }
            };
            storages.register(storage.name.clone(), storage.label(), backend);
        }

        let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);
        let ctx = CacheContext::new(
            Arc::new(MemoryMetadataStore::new()),
            Arc::new(LocalLockManager::new(config.lock.timeout())),
            storages,
            events,
        )
        .with_maximum_prune_attempts(config.maximum_prune_attempts);

        tracing::info!(
            storages = config.storages.len(),
            maximum_prune_attempts = config.maximum_prune_attempts,
            lock_timeout_ms = config.lock.timeout_ms,
            "Cache service initialized"
        );
        Ok(Self::new(Arc::new(ctx)))
    }

    pub fn context(&self) -> &Arc<CacheContext> {
        &self.ctx
    }

    /// Create the cache for `name`, or change the maximum size of the
    /// existing one. Either way the cache is pruned.
    pub async fn define_cache(&self, name: &str, maximum_size: u64) -> Result<Cache, CacheError> {
        match Cache::load(self.ctx.clone(), name).await {
            Ok(mut cache) => {
                if cache.maximum_size() != maximum_size {
                    cache.set_maximum_size(maximum_size);
                    cache.save().await?;
                } else {
                    cache.prune().await?;
                }
                Ok(cache)
            }
            Err(err) if err.is_not_found() => Cache::create(self.ctx.clone(), name, maximum_size).await,
            Err(err) => Err(err),
        }
    }

    pub async fn get_cache(&self, name: &str) -> Result<Cache, CacheError> {
        Cache::load(self.ctx.clone(), name).await
    }

    pub async fn list_caches(&self) -> Result<Vec<Cache>, CacheError> {
        let records = self.ctx.store.list_caches().await?;
        Ok(records
            .into_iter()
            .map(|record| Cache::from_record(self.ctx.clone(), record))
            .collect())
    }

    /// Partition `partition` of cache `cache`, created on first use
    pub async fn get_partition(&self, cache: &str, partition: &str) -> Result<Partition, CacheError> {
        self.get_cache(cache)
            .await?
            .get_or_create_partition(partition)
            .await
    }

    /// Purge every cache. Caches whose storage is not registered are skipped.
    pub async fn purge_all(&self) -> Result<(), CacheError> {
        for cache in self.list_caches().await? {
            cache.purge().await?;
        }
        Ok(())
    }

    /// Define every cache listed in `config`
    pub async fn sync_from_config(&self, config: &KuraConfig) -> Result<Vec<Cache>, CacheError> {
        let mut caches = Vec::with_capacity(config.caches.len());
        for definition in &config.caches {
            caches.push(
                self.define_cache(&definition.storage, definition.maximum_size)
                    .await?,
            );
        }
        Ok(caches)
    }
}
