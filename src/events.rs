//! Cache lifecycle events
//!
//! Caches and partitions notify an [`EventSink`] after each successful
//! create, edit or purge. Delivery is fire-and-forget.

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CacheEvent {
    CacheCreated { cache_id: u64, name: String },
    CacheEdited { cache_id: u64, name: String },
    CachePurged { cache_id: u64, name: String },
    #[serde(rename = "cache_partition_purged")]
    PartitionPurged { cache_id: u64, partition_id: u64, name: String },
}

impl CacheEvent {
    /// Stable event identifier, e.g. `cache_created`
    pub fn kind(&self) -> &'static str {
        match self {
            CacheEvent::CacheCreated { .. } => "cache_created",
            CacheEvent::CacheEdited { .. } => "cache_edited",
            CacheEvent::CachePurged { .. } => "cache_purged",
            CacheEvent::PartitionPurged { .. } => "cache_partition_purged",
        }
    }
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheEvent::CacheCreated { name, .. }
            | CacheEvent::CacheEdited { name, .. }
            | CacheEvent::CachePurged { name, .. } => write!(f, "{} {}", self.kind(), name),
            CacheEvent::PartitionPurged { name, cache_id, .. } => {
                write!(f, "{} {} (cache {})", self.kind(), name, cache_id)
            }
        }
    }
}

pub trait EventSink: Send + Sync {
    fn notify(&self, event: CacheEvent);
}

/// Emits every event as a structured `tracing` record
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn notify(&self, event: CacheEvent) {
        tracing::info!(event = event.kind(), details = %event, "Cache event");
    }
}

/// Keeps events in memory, in emission order
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<CacheEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CacheEvent> {
        self.events.lock().clone()
    }

    /// Event kinds in emission order
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(CacheEvent::kind).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemoryEventSink {
    fn notify(&self, event: CacheEvent) {
        self.events.lock().push(event);
    }
}
