//! Reloadable config section.
//!
//! A SIGHUP reload replaces the whole section at once. Short-lived readers
//! take a copy with [`ConfigStore::get`]; long-running loops hold a
//! [`watch::Receiver`] from [`ConfigStore::watch`] and pick up the new value
//! the moment it lands.

use tokio::sync::watch;

/// A shared config section. Clones see the same value.
#[derive(Clone)]
pub struct ConfigStore<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Replaces the section and wakes every watcher.
    pub fn update(&self, value: T) {
        // Stores the value even when nobody is watching.
        self.tx.send_replace(value);
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}
