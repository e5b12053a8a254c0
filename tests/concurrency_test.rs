// Concurrency tests
//
// Concurrent writers on a shared cache, run on the multi-threaded runtime.

use bytes::Bytes;
use futures::future::join_all;
use kura::cache::{Cache, CacheContext};
use kura::events::TracingEventSink;
use kura::lock::LocalLockManager;
use kura::storage::{MemoryStorage, StorageRegistry};
use kura::store::MemoryMetadataStore;
use std::sync::Arc;
use std::time::Duration;

fn context(storage: &MemoryStorage, lock_timeout: Duration) -> Arc<CacheContext> {
    let registry = Arc::new(StorageRegistry::new());
    registry.register("thumbnails", "Thumbnails", Arc::new(storage.clone()));
    Arc::new(CacheContext::new(
        Arc::new(MemoryMetadataStore::new()),
        Arc::new(LocalLockManager::new(lock_timeout)),
        registry,
        Arc::new(TracingEventSink),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_files_written_concurrently() {
    // Test: every writer sees only its own bytes
    let storage = MemoryStorage::new();
    let ctx = context(&storage, Duration::from_secs(5));
    let cache = Cache::create(ctx, "thumbnails", 1_000_000).await.unwrap();
    let partition = cache.get_or_create_partition("doc-1").await.unwrap();

    let tasks = (0..16).map(|i| {
        let partition = partition.clone();
        tokio::spawn(async move {
            let content = format!("content of file {}", i);
            let mut writer = partition.create_file(&format!("file-{}", i)).await?;
            for chunk in content.as_bytes().chunks(4) {
                writer.write(chunk).await?;
                tokio::task::yield_now().await;
            }
            writer.commit().await
        })
    });

    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    for i in 0..16 {
        let mut file = partition.get_file(&format!("file-{}", i)).await.unwrap();
        let expected = format!("content of file {}", i);
        assert_eq!(file.read_all().await.unwrap(), Bytes::from(expected.clone()));
        assert_eq!(file.file_size(), expected.len() as u64);
    }
    assert_eq!(storage.object_count(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_file_writers_are_serialized() {
    // Test: the second writer waits for the first's lock, one record remains
    let storage = MemoryStorage::new();
    let ctx = context(&storage, Duration::from_secs(5));
    let cache = Cache::create(ctx, "thumbnails", 1_000_000).await.unwrap();
    let partition = cache.get_or_create_partition("doc-1").await.unwrap();

    let tasks = ["first writer", "second writer"].into_iter().map(|content| {
        let partition = partition.clone();
        tokio::spawn(async move {
            let mut writer = partition.create_file("shared").await?;
            writer.write(content.as_bytes()).await?;
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.commit().await
        })
    });

    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let files = partition.get_files().await.unwrap();
    assert_eq!(files.len(), 1);

    let stored = storage.get("doc-1-shared").unwrap();
    assert!(stored == Bytes::from_static(b"first writer") || stored == Bytes::from_static(b"second writer"));
    assert_eq!(files[0].file_size(), stored.len() as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_respect_size_bound() {
    let storage = MemoryStorage::new();
    let ctx = context(&storage, Duration::from_secs(5));
    let cache = Cache::create(ctx, "thumbnails", 1000).await.unwrap();

    let tasks = (0..32).map(|i| {
        let cache = cache.clone();
        tokio::spawn(async move {
            let partition = cache.get_or_create_partition(&format!("doc-{}", i % 4)).await?;
            partition
                .create_file_with_content(&format!("file-{}", i), vec![0u8; 100])
                .await
        })
    });

    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    // One more write brings the cache back under its limit before storing
    let partition = cache.get_or_create_partition("doc-0").await.unwrap();
    let writer = partition.create_file("last").await.unwrap();
    assert!(cache.get_total_size().await.unwrap() <= 1000);
    writer.abort().await;

    assert_eq!(storage.object_count(), cache.get_files().await.unwrap().len());
}
