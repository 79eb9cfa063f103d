//! Persisted records and the store queries that read them.

pub mod pending;
pub mod scheduled_task;

pub use pending::{PendingNamespace, PendingRecord};
pub use scheduled_task::{ScheduledTask, StoredTask, TASKS_SUBLEVEL};
