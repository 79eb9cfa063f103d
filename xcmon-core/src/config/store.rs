//! Store configuration.

use std::path::PathBuf;

/// Where the embedded database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory of the sled database.
    pub path: PathBuf,
    /// Use a throwaway database that is deleted on drop. `path` is ignored.
    pub temporary: bool,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: false,
        }
    }

    /// A throwaway in-process database, for tests and dry runs.
    pub fn temporary() -> Self {
        Self {
            path: PathBuf::new(),
            temporary: true,
        }
    }
}
