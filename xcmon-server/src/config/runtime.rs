//! Runtime configuration re-exports.
//!
//! The validated types are defined in `xcmon-core::config`.

pub use xcmon_core::config::{
    JanitorConfig, MatchingConfig, SchedulerConfig, SharedConfig, StoreConfig,
};
