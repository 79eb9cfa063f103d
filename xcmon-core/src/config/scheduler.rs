//! Scheduler and janitor configuration.

use std::time::Duration;

/// How often the scheduler wakes up to fire due tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub frequency: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frequency: Duration::from_secs(5),
        }
    }
}

/// Expiry policy for pending entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JanitorConfig {
    /// Applied when a sweep is scheduled without an explicit expiry.
    pub sweep_expiry: Duration,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            sweep_expiry: Duration::from_secs(30 * 60),
        }
    }
}
