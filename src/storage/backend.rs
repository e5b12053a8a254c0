//! Backend trait for byte storage operations

use super::error::StorageError;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

/// Mode used when opening a stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read the committed bytes
    Read,
    /// Truncate and write. The object must already exist.
    Write,
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenMode::Read => write!(f, "read"),
            OpenMode::Write => write!(f, "write"),
        }
    }
}

/// An opened object handle returned by [`StorageBackend::open`]
#[async_trait]
pub trait StorageObject: Send + Sync {
    /// Read the remaining bytes of the object
    async fn read_to_end(&mut self) -> Result<Bytes, StorageError>;

    /// Append bytes to an object opened in [`OpenMode::Write`]
    async fn write(&mut self, data: &[u8]) -> Result<(), StorageError>;

    /// Flush pending writes and release the handle.
    /// Calling `close` more than once is a no-op.
    async fn close(&mut self) -> Result<(), StorageError>;
}

/// Abstraction over a flat, name-keyed blob store
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Open the object stored under `name`
    async fn open(&self, name: &str, mode: OpenMode) -> Result<Box<dyn StorageObject>, StorageError>;

    /// Store `content` under `name`, replacing any previous object
    async fn save(&self, name: &str, content: Bytes) -> Result<(), StorageError>;

    /// Delete the object stored under `name`.
    /// Deleting an absent object is not an error.
    async fn delete(&self, name: &str) -> Result<(), StorageError>;

    /// Check whether an object is stored under `name`
    async fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Size in bytes of the object stored under `name`
    async fn size(&self, name: &str) -> Result<u64, StorageError>;
}
