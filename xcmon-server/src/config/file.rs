//! TOML file configuration structures.
//!
//! These structs directly map to the `xcmon-config.toml` file format. Every
//! section and field is optional.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub store: StoreConfig,
    pub scheduler: SchedulerConfig,
    pub janitor: JanitorConfig,
    pub matching: MatchingConfig,
}

/// Store configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory of the embedded database.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/xcmon"),
        }
    }
}

/// Scheduler configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Milliseconds between two sweeps.
    pub frequency_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frequency_ms: 5_000,
        }
    }
}

/// Janitor configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JanitorConfig {
    /// Milliseconds an unmatched entry is kept before it is swept.
    pub sweep_expiry_ms: u64,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            sweep_expiry_ms: 30 * 60 * 1_000,
        }
    }
}

/// Matching configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Capacity of the notification channel.
    pub notification_buffer: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            notification_buffer: xcmon_core::events::DEFAULT_CHANNEL_BUFFER,
        }
    }
}
