//! Named mutual-exclusion locks
//!
//! Every mutation of a cached file happens while holding the lock named after
//! its `(cache, partition, filename)` triple. Locks are not reentrant: code
//! that already holds a lock must not try to acquire it again.

mod local;

pub use self::local::LocalLockManager;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Lock acquisition failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The lock is held and the manager does not wait
    #[error("Lock {0} is already held")]
    Held(String),

    /// The lock stayed held for the whole wait period
    #[error("Timed out after {waited:?} waiting for lock {name}")]
    Timeout { name: String, waited: Duration },

    /// The lock service itself failed
    #[error("Lock service unavailable: {0}")]
    Unavailable(String),
}

type ReleaseFn = Box<dyn FnOnce() + Send + Sync>;

/// A held lock. Released by [`Lock::release`] or when dropped.
pub struct Lock {
    name: String,
    release: Option<ReleaseFn>,
}

impl Lock {
    /// Wrap a held lock; `release` runs exactly once
    pub fn new(name: impl Into<String>, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn release(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            tracing::debug!(lock = %self.name, "Releasing lock");
            release();
        }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("name", &self.name)
            .field("held", &self.release.is_some())
            .finish()
    }
}

/// Lock service contract
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Acquire the lock called `name`
    async fn acquire(&self, name: &str) -> Result<Lock, LockError>;
}
