//! Size-bounded caches, their partitions and files
//!
//! - [`Cache`]: named container bound to one defined storage, with a maximum
//!   size enforced by [`Cache::prune`]
//! - [`Partition`]: namespace for filenames inside a cache, owner of the
//!   create-file protocol
//! - [`CacheFile`]: one stored blob plus its metadata record
//!
//! Every file operation runs under the lock named after the file's
//! `(cache id, partition id, filename)` triple. Code that already holds that
//! lock uses [`LockPolicy::AlreadyHeld`] to skip acquisition, since locks are
//! not reentrant.

mod bounded;
mod file;
mod partition;
mod usage;
mod writer;

pub use self::bounded::Cache;
pub use self::file::CacheFile;
pub use self::partition::Partition;
pub use self::usage::CacheUsage;
pub use self::writer::FileWriter;

use crate::constants::{COMBINED_KEY_SEPARATOR, DEFAULT_MAXIMUM_PRUNE_ATTEMPTS, FILE_LOCK_PREFIX};
use crate::events::EventSink;
use crate::lock::LockManager;
use crate::storage::StorageRegistry;
use crate::store::MetadataStore;
use std::sync::Arc;

/// Whether an operation acquires the file lock or runs under one the caller holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockPolicy {
    Acquire,
    AlreadyHeld,
}

/// Collaborators shared by every cache, partition and file handle
pub struct CacheContext {
    pub store: Arc<dyn MetadataStore>,
    pub locks: Arc<dyn LockManager>,
    pub storages: Arc<StorageRegistry>,
    pub events: Arc<dyn EventSink>,
    /// Failed prune deletions tolerated before prune gives up
    pub maximum_prune_attempts: u32,
}

impl CacheContext {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        locks: Arc<dyn LockManager>,
        storages: Arc<StorageRegistry>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            locks,
            storages,
            events,
            maximum_prune_attempts: DEFAULT_MAXIMUM_PRUNE_ATTEMPTS,
        }
    }

    pub fn with_maximum_prune_attempts(mut self, attempts: u32) -> Self {
        self.maximum_prune_attempts = attempts;
        self
    }
}

/// Storage key of a file: partition name and filename joined by `-`
pub fn combined_key(partition: &str, filename: &str) -> String {
    format!("{}{}{}", partition, COMBINED_KEY_SEPARATOR, filename)
}

/// Name of the lock guarding one file
pub fn file_lock_name(cache_id: u64, partition_id: u64, filename: &str) -> String {
    format!("{}-{}-{}-{}", FILE_LOCK_PREFIX, cache_id, partition_id, filename)
}
