//! In-process lock manager
//!
//! Tracks held lock names in a map of watch senders. Waiters subscribe to the
//! holder's sender and retry once it signals release:
//! - First caller for a name: inserts a sender and gets the lock
//! - Later callers: wait for the release signal, bounded by `wait_timeout`

use super::{Lock, LockError, LockManager};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct LocalLockManager {
    held: Arc<Mutex<HashMap<String, watch::Sender<bool>>>>,
    wait_timeout: Duration,
}

impl LocalLockManager {
    /// `wait_timeout` of zero makes acquisition fail immediately when held
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            held: Arc::new(Mutex::new(HashMap::new())),
            wait_timeout,
        }
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.held.lock().contains_key(name)
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }

    fn guard(&self, name: &str) -> Lock {
        let held = Arc::clone(&self.held);
        let key = name.to_string();
        Lock::new(name, move || {
            if let Some(sender) = held.lock().remove(&key) {
                // Wake every waiter; no receivers is fine
                let _ = sender.send(true);
            }
        })
    }
}

impl Default for LocalLockManager {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[async_trait]
impl LockManager for LocalLockManager {
    async fn acquire(&self, name: &str) -> Result<Lock, LockError> {
        let deadline = tokio::time::Instant::now() + self.wait_timeout;

        loop {
            let mut receiver = {
                let mut held = self.held.lock();
                match held.get(name) {
                    Some(sender) => sender.subscribe(),
                    None => {
                        let (sender, _receiver) = watch::channel(false);
                        held.insert(name.to_string(), sender);
                        tracing::debug!(lock = %name, "Acquired lock");
                        return Ok(self.guard(name));
                    }
                }
            };

            if self.wait_timeout.is_zero() {
                return Err(LockError::Held(name.to_string()));
            }

            tracing::debug!(lock = %name, "Lock held, waiting for release");
            let released = tokio::time::timeout_at(deadline, receiver.wait_for(|done| *done))
                .await
                .is_ok();
            if !released {
                return Err(LockError::Timeout {
                    name: name.to_string(),
                    waited: self.wait_timeout,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_first_acquire_succeeds() {
        let manager = LocalLockManager::default();

        let lock = manager.acquire("a").await.unwrap();
        assert!(manager.is_held("a"));
        assert_eq!(manager.held_count(), 1);

        lock.release();
        assert!(!manager.is_held("a"));
    }

    #[tokio::test]
    async fn test_fail_fast_when_held() {
        let manager = LocalLockManager::default();
        let _lock = manager.acquire("a").await.unwrap();

        let result = manager.acquire("a").await;
        assert_eq!(result.unwrap_err(), LockError::Held("a".to_string()));

        // Different names are independent
        assert!(manager.acquire("b").await.is_ok());
    }

    #[tokio::test]
    async fn test_waiter_acquires_after_release() {
        let manager = LocalLockManager::new(Duration::from_secs(5));
        let order = Arc::new(AtomicUsize::new(0));

        let lock = manager.acquire("a").await.unwrap();

        let manager2 = manager.clone();
        let order2 = Arc::clone(&order);
        let waiter = tokio::spawn(async move {
            let lock = manager2.acquire("a").await.unwrap();
            order2.fetch_add(1, Ordering::SeqCst);
            drop(lock);
        });

        // Give waiter time to start waiting
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(order.load(Ordering::SeqCst), 0, "Waiter should be blocked");

        drop(lock);
        waiter.await.unwrap();
        assert_eq!(order.load(Ordering::SeqCst), 1);
        assert_eq!(manager.held_count(), 0);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let manager = LocalLockManager::new(Duration::from_millis(30));
        let _lock = manager.acquire("a").await.unwrap();

        let result = manager.acquire("a").await;
        assert!(matches!(result, Err(LockError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_only_one_waiter_wins_each_release() {
        let manager = LocalLockManager::new(Duration::from_secs(5));
        let inside = Arc::new(AtomicUsize::new(0));
        let lock = manager.acquire("a").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let manager = manager.clone();
            let inside = Arc::clone(&inside);
            handles.push(tokio::spawn(async move {
                let lock = manager.acquire("a").await.unwrap();
                let concurrent = inside.fetch_add(1, Ordering::SeqCst);
                assert_eq!(concurrent, 0, "Two holders at once");
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
                drop(lock);
            }));
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(lock);
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
