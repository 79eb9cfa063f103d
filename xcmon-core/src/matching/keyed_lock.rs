//! Per-key async mutual exclusion.
//!
//! Each key gets its own mutex, created on first use and dropped again when
//! the last holder or waiter lets go, so the map only holds keys that are
//! in use. Different keys never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

#[derive(Default)]
pub struct KeyedLock {
    slots: Mutex<HashMap<String, Slot>>,
}

/// Holds the lock for one key until dropped.
pub struct KeyGuard<'a> {
    owner: &'a KeyedLock,
    key: String,
    slot: Slot,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        // The map is only touched in short non-panicking sections.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let slot = Arc::clone(self.slots().entry(key.to_owned()).or_default());
        let guard = Arc::clone(&slot).lock_owned().await;
        KeyGuard {
            owner: self,
            key: key.to_owned(),
            slot,
            guard: Some(guard),
        }
    }

    /// Number of keys currently locked or waited on.
    #[cfg(test)]
    pub fn active_keys(&self) -> usize {
        self.slots().len()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.owner.slots();
        // One reference in the map, one here: nobody else is waiting.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_map_is_cleaned_up() {
        let locks = KeyedLock::new();
        {
            let _a = locks.lock("a").await;
            let _b = locks.lock("b").await;
            assert_eq!(locks.active_keys(), 2);
        }
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLock::new();
        let _a = locks.lock("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLock::new());
        let inside = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("same").await;
                let before = inside.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                assert_eq!(before, 0);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(locks.active_keys(), 0);
    }
}
