//! Persisted record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A size-bounded cache bound to one defined storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub id: u64,
    /// Name of the defined storage holding the cache bytes
    pub name: String,
    /// Size in bytes at which old files start being pruned
    pub maximum_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRecord {
    pub id: u64,
    pub cache_id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: u64,
    pub partition_id: u64,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    /// Last size reported by the storage backend
    pub file_size: u64,
}
