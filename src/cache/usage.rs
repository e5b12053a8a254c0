//! Cache usage snapshot

use serde::Serialize;
use std::fmt;

/// Point-in-time size accounting for one cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheUsage {
    /// Sum of recorded file sizes in bytes
    pub total_size: u64,
    /// Configured ceiling in bytes
    pub maximum_size: u64,
    pub partition_count: usize,
    pub file_count: usize,
}

impl CacheUsage {
    /// Share of the maximum size in use, in percent.
    /// Returns 0.0 for a zero maximum.
    pub fn percent_used(&self) -> f64 {
        if self.maximum_size == 0 {
            0.0
        } else {
            self.total_size as f64 * 100.0 / self.maximum_size as f64
        }
    }

    /// True when the cache holds more than its maximum size
    pub fn is_over_limit(&self) -> bool {
        self.total_size > self.maximum_size
    }
}

impl fmt::Display for CacheUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} bytes ({:.1}%)",
            self.total_size,
            self.maximum_size,
            self.percent_used()
        )
    }
}
