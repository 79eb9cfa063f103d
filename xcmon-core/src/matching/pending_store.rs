//! The pending keyspaces as one unit.

use crate::entities::{PendingNamespace, PendingRecord};
use crate::matching::correlation::subscription_prefix;
use crate::store::{Store, StoreError, Sublevel};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Entries waiting for their counterpart, one sublevel per namespace.
#[derive(Clone)]
pub struct PendingStore {
    awaiting_destination: Sublevel,
    awaiting_origin: Sublevel,
    relayed: Sublevel,
}

impl PendingStore {
    pub fn open(store: &Store) -> Result<Self, StoreError> {
        Ok(Self {
            awaiting_destination: store
                .sublevel(PendingNamespace::AwaitingDestination.as_str())?,
            awaiting_origin: store.sublevel(PendingNamespace::AwaitingOrigin.as_str())?,
            relayed: store.sublevel(PendingNamespace::Relayed.as_str())?,
        })
    }

    pub fn sublevel(&self, namespace: PendingNamespace) -> &Sublevel {
        match namespace {
            PendingNamespace::AwaitingDestination => &self.awaiting_destination,
            PendingNamespace::AwaitingOrigin => &self.awaiting_origin,
            PendingNamespace::Relayed => &self.relayed,
        }
    }

    pub fn peek<T: DeserializeOwned>(
        &self,
        namespace: PendingNamespace,
        key: &str,
    ) -> Result<Option<PendingRecord<T>>, StoreError> {
        self.sublevel(namespace).get(key)
    }

    /// Removes and returns the entry. Atomic against concurrent takes.
    pub fn take<T: DeserializeOwned>(
        &self,
        namespace: PendingNamespace,
        key: &str,
    ) -> Result<Option<PendingRecord<T>>, StoreError> {
        self.sublevel(namespace).take(key)
    }

    /// Removes `key` from both namespaces at once.
    pub fn delete_both(
        &self,
        first: PendingNamespace,
        second: PendingNamespace,
        key: &str,
    ) -> Result<(), StoreError> {
        self.sublevel(first).delete_with(self.sublevel(second), key)
    }

    /// Stores the entry and returns the one it replaced.
    pub fn put<T: Serialize + DeserializeOwned>(
        &self,
        namespace: PendingNamespace,
        key: &str,
        record: &PendingRecord<T>,
    ) -> Result<Option<PendingRecord<T>>, StoreError> {
        self.sublevel(namespace).put(key, record)
    }

    /// Every key of one subscription, across all namespaces.
    pub fn subscription_keys(
        &self,
        subscription_id: &str,
    ) -> Result<Vec<(PendingNamespace, String)>, StoreError> {
        let prefix = subscription_prefix(subscription_id);
        let mut keys = Vec::new();
        for namespace in PendingNamespace::ALL {
            for key in self.sublevel(namespace).keys_with_prefix(&prefix)? {
                keys.push((namespace, key));
            }
        }
        Ok(keys)
    }

    /// Entries across all namespaces.
    pub fn len(&self) -> usize {
        PendingNamespace::ALL
            .into_iter()
            .map(|namespace| self.sublevel(namespace).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
