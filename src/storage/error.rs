//! Error types for storage backend operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object name: {0:?}")]
    InvalidName(String),

    #[error("Object {0} is not open for {1}")]
    InvalidMode(String, &'static str),

    #[error("Object {0} is closed")]
    Closed(String),

    #[error("Storage full: cannot store {0}")]
    StorageFull(String),

    #[error("Backend unavailable")]
    BackendUnavailable,
}

impl StorageError {
    /// True when the error means the object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound(_) => true,
            StorageError::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
