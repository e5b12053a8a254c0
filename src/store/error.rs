//! Error types for metadata store operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} {key:?} already exists")]
    Conflict { entity: &'static str, key: String },

    #[error("{entity} {key:?} does not exist")]
    NotFound { entity: &'static str, key: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
