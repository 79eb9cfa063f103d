//! Configuration types for xcmon.
//!
//! These types represent the validated runtime configuration and can be
//! shared across crates. Loading and parsing the configuration file is
//! handled by the server crate.

mod config_store;
mod matching;
mod scheduler;
mod store;

pub use config_store::ConfigStore;
pub use matching::MatchingConfig;
pub use scheduler::{JanitorConfig, SchedulerConfig};
pub use store::StoreConfig;

/// Shared configuration state with a separate store for each section.
///
/// The reloadable sections sit behind a [`ConfigStore`] so that running
/// components pick up a new value on their next read. The store location
/// cannot change while the database is open and is kept as a plain value.
#[derive(Clone)]
pub struct SharedConfig {
    /// Database location.
    pub store: StoreConfig,
    /// Tick frequency of the scheduler.
    pub scheduler: ConfigStore<SchedulerConfig>,
    /// Default expiry for pending entries.
    pub janitor: ConfigStore<JanitorConfig>,
    /// Matching engine settings.
    pub matching: ConfigStore<MatchingConfig>,
}

impl SharedConfig {
    pub fn new(
        store: StoreConfig,
        scheduler: SchedulerConfig,
        janitor: JanitorConfig,
        matching: MatchingConfig,
    ) -> Self {
        Self {
            store,
            scheduler: ConfigStore::new(scheduler),
            janitor: ConfigStore::new(janitor),
            matching: ConfigStore::new(matching),
        }
    }
}
