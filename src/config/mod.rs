// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::constants::{DEFAULT_LOCK_TIMEOUT_MS, DEFAULT_LOG_LEVEL, DEFAULT_MAXIMUM_PRUNE_ATTEMPTS};

mod storage;

pub use self::storage::{StorageConfig, StorageKind};

fn default_maximum_prune_attempts() -> u32 {
    DEFAULT_MAXIMUM_PRUNE_ATTEMPTS
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KuraConfig {
    /// Failed prune deletions tolerated before prune gives up (default: 100)
    #[serde(default = "default_maximum_prune_attempts")]
    pub maximum_prune_attempts: u32,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storages: Vec<StorageConfig>,
    #[serde(default)]
    pub caches: Vec<CacheDefinition>,
}

impl Default for KuraConfig {
    fn default() -> Self {
        Self {
            maximum_prune_attempts: default_maximum_prune_attempts(),
            lock: LockConfig::default(),
            logging: LoggingConfig::default(),
            storages: Vec::new(),
            caches: Vec::new(),
        }
    }
}

/// Local lock manager settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// How long to wait for a held lock, 0 fails immediately (default: 2000)
    #[serde(default = "default_lock_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl LockConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// A cache to create (or resize) on startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheDefinition {
    /// Name of a defined storage
    pub storage: String,
    /// Maximum size of the cache in bytes
    pub maximum_size: u64,
}

impl KuraConfig {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.maximum_prune_attempts == 0 {
            return Err("maximum_prune_attempts must be >= 1".to_string());
        }

        let mut storage_names = HashSet::new();
        for storage in &self.storages {
            storage.validate()?;
            if !storage_names.insert(storage.name.as_str()) {
                return Err(format!("Duplicate storage name '{}'", storage.name));
            }
        }

        let mut cache_names = HashSet::new();
        for cache in &self.caches {
            if !storage_names.contains(cache.storage.as_str()) {
                return Err(format!(
                    "Cache refers to undefined storage '{}'",
                    cache.storage
                ));
            }
            if !cache_names.insert(cache.storage.as_str()) {
                return Err(format!(
                    "Duplicate cache for storage '{}'",
                    cache.storage
                ));
            }
            if cache.maximum_size == 0 {
                return Err(format!(
                    "Cache '{}' has maximum_size 0. Maximum size must be >= 1 byte.",
                    cache.storage
                ));
            }
        }

        Ok(())
    }
}
