//! Application state shared by the running daemon's tasks.

use crate::config::runtime::SharedConfig;
use std::sync::Arc;
use xcmon_core::processors::{MatchingEngine, Scheduler};

/// Application state for `xcmon-server run`.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Runtime configuration (reloadable sections swap on SIGHUP).
    pub config: SharedConfig,
    /// The matching engine fed by the ingest task.
    pub engine: Arc<MatchingEngine>,
    /// Expiry scheduler shared with the engine's janitor.
    pub scheduler: Scheduler,
}

impl AppState {
    pub fn new(config: SharedConfig, engine: MatchingEngine, scheduler: Scheduler) -> Self {
        Self {
            config,
            engine: Arc::new(engine),
            scheduler,
        }
    }
}
