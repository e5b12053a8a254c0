// Error types module

use crate::lock::LockError;
use crate::storage::StorageError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors returned by cache, partition and file operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// The named lock could not be obtained. Nothing was changed; safe to retry.
    #[error("Lock unavailable: {0}")]
    LockUnavailable(#[from] LockError),

    /// The storage backend failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Prune could not bring the cache under its maximum size
    #[error("Too many cache prune attempts failed for cache {cache} ({attempts} attempts)")]
    PruneExhausted { cache: String, attempts: u32 },

    /// Requested cache, partition or file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The metadata store failed
    #[error("Metadata store error: {0}")]
    Store(#[from] StoreError),

    /// The cache's defined storage is not registered
    #[error("Storage {0:?} is not defined")]
    StorageUnavailable(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The file writer already failed or finished
    #[error("File writer for {0} is closed")]
    WriterClosed(String),
}

impl CacheError {
    /// True for a lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }

    /// True when the error came from lock contention
    pub fn is_lock_error(&self) -> bool {
        matches!(self, CacheError::LockUnavailable(_))
    }
}
