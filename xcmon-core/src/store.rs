//! Embedded key-value store.
//!
//! A [`Store`] is one sled database; every namespace (pending entries,
//! scheduler tasks) is a sled tree wrapped in a [`Sublevel`]. Values are JSON.
//! Single-key operations are atomic. The few multi-key writes
//! ([`Sublevel::insert_batch`], [`Sublevel::delete_with`]) are sled batches or
//! transactions. Removals decode before they delete, so a value that fails to
//! decode stays where it is.

use crate::config::StoreConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),
    #[error("value encoding error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("sublevel not found: {0}")]
    MissingSublevel(String),
}

/// Handle to the whole database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    db: sled::Db,
}

impl Store {
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let db = if config.temporary {
            sled::Config::new().temporary(true).open()?
        } else {
            sled::Config::new().path(&config.path).open()?
        };
        Ok(Self { db })
    }

    /// Opens the named sublevel, creating it if needed.
    pub fn sublevel(&self, name: &str) -> Result<Sublevel, StoreError> {
        Ok(Sublevel {
            name: name.to_owned(),
            tree: self.db.open_tree(name)?,
        })
    }

    /// Opens the named sublevel only if it already exists.
    pub fn existing_sublevel(&self, name: &str) -> Result<Sublevel, StoreError> {
        let exists = self
            .db
            .tree_names()
            .iter()
            .any(|tree| &**tree == name.as_bytes());
        if !exists {
            return Err(StoreError::MissingSublevel(name.to_owned()));
        }
        self.sublevel(name)
    }

    /// Drops a sublevel and everything in it. Returns false if it did not exist.
    #[cfg(test)]
    pub fn drop_sublevel(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.db.drop_tree(name)?)
    }

    pub async fn flush(&self) -> Result<usize, StoreError> {
        Ok(self.db.flush_async().await?)
    }
}

/// A named keyspace inside a [`Store`].
#[derive(Clone)]
pub struct Sublevel {
    name: String,
    tree: sled::Tree,
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn abort(e: serde_json::Error) -> ConflictableTransactionError<StoreError> {
    ConflictableTransactionError::Abort(StoreError::Codec(e))
}

impl From<TransactionError<StoreError>> for StoreError {
    fn from(e: TransactionError<StoreError>) -> Self {
        match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => StoreError::Sled(e),
        }
    }
}

fn key_string(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

impl Sublevel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.tree
            .get(key.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Writes `value` under `key` and returns what was there before.
    pub fn put<T: Serialize + DeserializeOwned>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<Option<T>, StoreError> {
        let bytes = serde_json::to_vec(value)?;
        self.tree
            .insert(key.as_bytes(), bytes)?
            .map(|previous| decode(&previous))
            .transpose()
    }

    /// Removes `key` and returns the value it held. A missing key is `Ok(None)`.
    ///
    /// A value that does not decode as `T` is left in place.
    pub fn take<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let taken = self.tree.transaction(|tx| {
            let Some(bytes) = tx.get(key.as_bytes())? else {
                return Ok(None);
            };
            let value = serde_json::from_slice(&bytes).map_err(abort)?;
            tx.remove(key.as_bytes())?;
            Ok(Some(value))
        })?;
        Ok(taken)
    }

    /// Removes `key` only if `predicate` accepts its current value.
    /// Returns whether anything was removed.
    pub fn delete_if(
        &self,
        key: &str,
        predicate: impl Fn(&[u8]) -> bool,
    ) -> Result<bool, StoreError> {
        let removed = self
            .tree
            .transaction(|tx| match tx.get(key.as_bytes())? {
                Some(bytes) if predicate(&bytes) => {
                    tx.remove(key.as_bytes())?;
                    Ok::<_, ConflictableTransactionError<StoreError>>(true)
                }
                _ => Ok(false),
            })?;
        Ok(removed)
    }

    /// Removes `key` from this sublevel and from `other` in one transaction.
    pub fn delete_with(&self, other: &Sublevel, key: &str) -> Result<(), StoreError> {
        use sled::Transactional;

        (&self.tree, &other.tree).transaction(|(first, second)| {
            first.remove(key.as_bytes())?;
            second.remove(key.as_bytes())?;
            Ok::<_, ConflictableTransactionError<StoreError>>(())
        })?;
        Ok(())
    }

    /// Removes `key` without decoding. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.tree.remove(key.as_bytes())?.is_some())
    }

    /// Writes all entries in one atomic batch.
    pub fn insert_batch<T: Serialize>(&self, entries: &[(String, T)]) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for (key, value) in entries {
            batch.insert(key.as_bytes(), serde_json::to_vec(value)?);
        }
        self.tree.apply_batch(batch)?;
        Ok(())
    }

    /// Keys starting with `prefix`, in order.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.tree
            .scan_prefix(prefix.as_bytes())
            .keys()
            .map(|key| Ok(key_string(&key?)))
            .collect()
    }

    /// Up to `limit` decoded entries starting with `prefix`, in order.
    pub fn scan_prefix<T: DeserializeOwned>(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<(String, T)>, StoreError> {
        let mut entries = Vec::new();
        for item in self.tree.scan_prefix(prefix.as_bytes()).take(limit) {
            let (key, value) = item?;
            entries.push((key_string(&key), decode(&value)?));
        }
        Ok(entries)
    }

    /// Up to `limit` decoded entries with keys strictly greater than `after`.
    pub fn scan_after<T: DeserializeOwned>(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(String, T)>, StoreError> {
        let iter = match after {
            Some(after) => self.tree.range::<&[u8], _>((
                std::ops::Bound::Excluded(after.as_bytes()),
                std::ops::Bound::Unbounded,
            )),
            None => self.tree.iter(),
        };
        let mut entries = Vec::new();
        for item in iter.take(limit) {
            let (key, value) = item?;
            entries.push((key_string(&key), decode(&value)?));
        }
        Ok(entries)
    }

    /// All raw entries with keys strictly less than `bound`, in order.
    ///
    /// Values are left undecoded so one corrupt entry does not hide the rest.
    pub fn raw_before(&self, bound: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        self.tree
            .range::<&[u8], _>(..bound.as_bytes())
            .map(|item| {
                let (key, value) = item?;
                Ok((key_string(&key), value.to_vec()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open(&StoreConfig::temporary()).unwrap()
    }

    #[test]
    fn test_put_returns_previous_value() {
        let level = store().sublevel("test").unwrap();
        assert_eq!(level.put("a", &1u32).unwrap(), None);
        assert_eq!(level.put("a", &2u32).unwrap(), Some(1));
        assert_eq!(level.get::<u32>("a").unwrap(), Some(2));
        assert_eq!(level.take::<u32>("a").unwrap(), Some(2));
        assert_eq!(level.take::<u32>("a").unwrap(), None);
        assert!(!level.delete("a").unwrap());
    }

    #[test]
    fn test_take_keeps_undecodable_value() {
        let level = store().sublevel("test").unwrap();
        level.put("a", &serde_json::json!({"bogus": 1})).unwrap();

        assert!(matches!(level.take::<u32>("a"), Err(StoreError::Codec(_))));
        assert_eq!(
            level.get::<serde_json::Value>("a").unwrap(),
            Some(serde_json::json!({"bogus": 1}))
        );
    }

    #[test]
    fn test_conditional_and_paired_deletes() {
        let store = store();
        let first = store.sublevel("first").unwrap();
        let second = store.sublevel("second").unwrap();
        first.put("k", &1u32).unwrap();
        second.put("k", &2u32).unwrap();
        second.put("other", &3u32).unwrap();

        assert!(!first.delete_if("k", |bytes| bytes == b"2").unwrap());
        assert!(first.delete_if("k", |bytes| bytes == b"1").unwrap());
        assert!(!first.delete_if("k", |_| true).unwrap());

        first.put("k", &1u32).unwrap();
        first.delete_with(&second, "k").unwrap();
        assert!(first.is_empty());
        assert_eq!(second.len(), 1);
        // Missing keys are fine.
        first.delete_with(&second, "k").unwrap();
    }

    #[test]
    fn test_prefix_scan_is_bounded_by_separator() {
        let level = store().sublevel("test").unwrap();
        level.put("sub-1:a", &1u32).unwrap();
        level.put("sub-1:b", &2u32).unwrap();
        level.put("sub-10:a", &3u32).unwrap();

        assert_eq!(level.keys_with_prefix("sub-1:").unwrap(), vec!["sub-1:a", "sub-1:b"]);
        let limited: Vec<(String, u32)> = level.scan_prefix("sub-1", 2).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_range_scans() {
        let level = store().sublevel("test").unwrap();
        let entries: Vec<(String, u32)> = vec![
            ("2024-01-01".to_owned(), 1),
            ("2024-06-01".to_owned(), 2),
            ("2025-01-01".to_owned(), 3),
        ];
        level.insert_batch(&entries).unwrap();

        let before = level.raw_before("2025").unwrap();
        assert_eq!(before.len(), 2);

        let after: Vec<(String, u32)> = level.scan_after(Some("2024-01-01"), 10).unwrap();
        assert_eq!(after.iter().map(|(_, v)| *v).collect::<Vec<_>>(), vec![2, 3]);

        let first: Vec<(String, u32)> = level.scan_after(None, 1).unwrap();
        assert_eq!(first[0].1, 1);
    }

    #[test]
    fn test_existing_sublevel() {
        let store = store();
        assert!(matches!(
            store.existing_sublevel("nope"),
            Err(StoreError::MissingSublevel(name)) if name == "nope"
        ));
        store.sublevel("yes").unwrap();
        assert!(store.existing_sublevel("yes").is_ok());
        assert!(store.drop_sublevel("yes").unwrap());
        assert!(store.existing_sublevel("yes").is_err());
    }
}
