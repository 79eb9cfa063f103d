//! Admin request and response types.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// One entry of a pending namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPendingEntryResponse {
    pub namespace: String,
    pub key: String,
    /// Scheduler key of the entry's expiry task.
    pub expiry_task: String,
    pub stored_at: i64,
    pub message: serde_json::Value,
}

/// One persisted scheduler task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminScheduledTaskResponse {
    pub key: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub payload: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 200;

/// Query parameters for listing a pending namespace.
#[derive(Debug, Clone, Deserialize)]
pub struct ListPendingQuery {
    pub namespace: String,
    /// Only entries under this subscription.
    pub subscription_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Query parameters for listing scheduled tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct ListTasksQuery {
    /// Start listing strictly after this key.
    pub after: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

/// Clamp limit to a safe range.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}
