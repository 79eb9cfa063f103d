//! Long-running processors.
//!
//! - `Scheduler`: persists delayed tasks and fires them by type when due
//! - `Janitor`: schedules and executes "delete key K from sublevel N" sweeps
//! - `MatchingEngine`: receives `XcmEvent`, emits `XcmNotification`

pub mod janitor;
pub mod matching_engine;
pub mod scheduler;

pub use janitor::{Janitor, JanitorTask, SWEEP_TASK_TYPE};
pub use matching_engine::{MatchOutcome, MatchingEngine, MatchingError, RejectReason};
pub use scheduler::{DispatchError, Scheduler, SchedulerError, TaskListener, TickReport};
