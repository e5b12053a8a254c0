// Metadata store tests through the cache API

use chrono::{Duration as ChronoDuration, Utc};
use kura::cache::{Cache, CacheContext};
use kura::events::TracingEventSink;
use kura::lock::LocalLockManager;
use kura::storage::{MemoryStorage, StorageRegistry};
use kura::store::{MemoryMetadataStore, MetadataStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn context(store: Arc<MemoryMetadataStore>, storage: &MemoryStorage) -> Arc<CacheContext> {
    let registry = Arc::new(StorageRegistry::new());
    registry.register("thumbnails", "Thumbnails", Arc::new(storage.clone()));
    Arc::new(CacheContext::new(
        store,
        Arc::new(LocalLockManager::new(Duration::ZERO)),
        registry,
        Arc::new(TracingEventSink),
    ))
}

#[tokio::test]
async fn test_cache_survives_snapshot_reload() {
    // Test: records saved to a snapshot drive the cache after a restart
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("metadata.json");
    let storage = MemoryStorage::new();

    let store = Arc::new(MemoryMetadataStore::new());
    let cache = Cache::create(context(store.clone(), &storage), "thumbnails", 1000)
        .await
        .unwrap();
    let partition = cache.get_or_create_partition("doc-1").await.unwrap();
    partition.create_file_with_content("A", vec![0u8; 600]).await.unwrap();
    partition.create_file_with_content("B", vec![0u8; 600]).await.unwrap();
    store.save_to_file(&path).await.unwrap();

    let reloaded = Arc::new(MemoryMetadataStore::load_from_file(&path).await.unwrap());
    let cache = Cache::load(context(reloaded, &storage), "thumbnails").await.unwrap();
    assert_eq!(cache.get_total_size().await.unwrap(), 1200);

    cache.prune().await.unwrap();
    let files = cache.get_files().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].filename(), "B");
    assert_eq!(storage.names(), vec!["doc-1-B".to_string()]);
}

#[tokio::test]
async fn test_earliest_file_uses_created_at() {
    let store = MemoryMetadataStore::new();
    let cache = store.create_cache("thumbnails", 100).await.unwrap();
    let partition = store.create_partition(cache.id, "p").await.unwrap();

    let now = Utc::now();
    store.create_file(partition.id, "newer", now).await.unwrap();
    store
        .create_file(partition.id, "older", now - ChronoDuration::seconds(60))
        .await
        .unwrap();

    let earliest = store.earliest_file(cache.id).await.unwrap().unwrap();
    assert_eq!(earliest.filename, "older");
}

#[tokio::test]
async fn test_update_missing_file_is_not_found() {
    let store = MemoryMetadataStore::new();
    let err = store.update_file_size(42, 10).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "file", .. }));

    // Deleting is idempotent
    store.delete_file(42).await.unwrap();
}

#[tokio::test]
async fn test_get_or_create_partition_is_stable() {
    let store = MemoryMetadataStore::new();
    let cache = store.create_cache("thumbnails", 100).await.unwrap();

    let first = store.get_or_create_partition(cache.id, "p").await.unwrap();
    let second = store.get_or_create_partition(cache.id, "p").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        store.get_partition_by_id(first.id).await.unwrap(),
        Some(first)
    );
}
