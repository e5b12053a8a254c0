// Constants module - centralized default values for configuration
//
// This module defines the default values used throughout the codebase.

// =============================================================================
// Cache defaults
// =============================================================================

/// Failed prune deletions tolerated before prune gives up
pub const DEFAULT_MAXIMUM_PRUNE_ATTEMPTS: u32 = 100;

/// Separator between partition name and filename in storage keys
pub const COMBINED_KEY_SEPARATOR: &str = "-";

/// Prefix of the per-file lock names
pub const FILE_LOCK_PREFIX: &str = "cache_partition-file";

// =============================================================================
// Lock defaults
// =============================================================================

/// Default time to wait for a held file lock (2 seconds)
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2000;

// =============================================================================
// Logging defaults
// =============================================================================

/// Default log filter directive when RUST_LOG is not set
pub const DEFAULT_LOG_LEVEL: &str = "info";
