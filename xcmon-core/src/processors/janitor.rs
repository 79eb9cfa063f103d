//! Janitor processor.
//!
//! The Janitor turns "delete key K from sublevel N after E" into a
//! scheduler task of type [`SWEEP_TASK_TYPE`] and carries it out when the
//! task comes due. Deleting a key that is already gone is a success. A
//! sublevel that no longer exists is logged and skipped.
//!
//! Entries that record their own `expiryTask` (pending records do) are only
//! deleted by that task. A stale sweep left behind by a replaced entry
//! leaves the newer entry alone.

use crate::config::{ConfigStore, JanitorConfig};
use crate::entities::ScheduledTask;
use crate::processors::scheduler::{DispatchError, Scheduler, SchedulerError, TaskListener};
use crate::store::{Store, StoreError};
use crate::utils::task_key::{due_after, task_key};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Task type the janitor registers with the scheduler.
pub const SWEEP_TASK_TYPE: &str = "janitor.sweep";

/// A deletion to schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JanitorTask {
    pub sublevel: String,
    pub key: String,
    /// Falls back to the configured sweep expiry.
    pub expiry: Option<Duration>,
}

impl JanitorTask {
    pub fn new(sublevel: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            sublevel: sublevel.into(),
            key: key.into(),
            expiry: None,
        }
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }
}

/// Payload of a sweep task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPayload {
    pub sublevel: String,
    pub key: String,
}

/// Schedules and cancels sweeps. Cheap to clone.
#[derive(Clone)]
pub struct Janitor {
    scheduler: Scheduler,
    config: ConfigStore<JanitorConfig>,
}

impl Janitor {
    /// Creates the janitor and registers its sweep listener with `scheduler`.
    pub async fn new(store: Store, scheduler: Scheduler, config: ConfigStore<JanitorConfig>) -> Self {
        scheduler
            .on(SWEEP_TASK_TYPE, Arc::new(SweepListener { store }))
            .await;
        Self { scheduler, config }
    }

    /// Schedules all deletions relative to the current time.
    ///
    /// Returns the scheduler key of each task, in input order.
    pub async fn schedule(&self, tasks: Vec<JanitorTask>) -> Result<Vec<String>, SchedulerError> {
        self.schedule_at(tasks, OffsetDateTime::now_utc()).await
    }

    /// Schedules all deletions relative to `now`.
    pub async fn schedule_at(
        &self,
        tasks: Vec<JanitorTask>,
        now: OffsetDateTime,
    ) -> Result<Vec<String>, SchedulerError> {
        let default_expiry = self.config.get().sweep_expiry;
        let mut keys = Vec::with_capacity(tasks.len());
        let mut scheduled = Vec::with_capacity(tasks.len());
        for task in tasks {
            let due = due_after(now, task.expiry.unwrap_or(default_expiry));
            let key = task_key(due);
            let payload = serde_json::to_value(SweepPayload {
                sublevel: task.sublevel,
                key: task.key,
            })
            .map_err(StoreError::from)?;
            keys.push(key.clone());
            scheduled.push(ScheduledTask::new(key, SWEEP_TASK_TYPE, payload));
        }
        self.scheduler.schedule(scheduled).await?;
        Ok(keys)
    }

    /// Cancels a scheduled sweep. Returns false if it already ran or never existed.
    pub async fn cancel(&self, task_key: &str) -> Result<bool, SchedulerError> {
        self.scheduler.remove(task_key).await
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

/// The part of a stored value that names its expiry task.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpiryOwner {
    expiry_task: String,
}

/// Whether the task `task_key` may delete `value`.
fn swept_by(value: &[u8], task_key: &str) -> bool {
    match serde_json::from_slice::<ExpiryOwner>(value) {
        Ok(owner) => owner.expiry_task == task_key,
        Err(_) => true,
    }
}

/// Carries out due sweeps.
struct SweepListener {
    store: Store,
}

#[async_trait]
impl TaskListener for SweepListener {
    async fn on_task(&self, task: &ScheduledTask) -> Result<(), DispatchError> {
        let payload: SweepPayload = serde_json::from_value(task.payload.clone())?;
        match self.store.existing_sublevel(&payload.sublevel) {
            Ok(level) => {
                let removed = level.delete_if(&payload.key, |value| swept_by(value, &task.key))?;
                debug!(
                    sublevel = %payload.sublevel,
                    key = %payload.key,
                    removed,
                    "Janitor sweep"
                );
                Ok(())
            }
            Err(StoreError::MissingSublevel(sublevel)) => {
                warn!(%sublevel, key = %payload.key, "Janitor sweep skipped, sublevel is gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SchedulerConfig, StoreConfig};

    async fn setup() -> (Store, Janitor) {
        let store = Store::open(&StoreConfig::temporary()).unwrap();
        let scheduler =
            Scheduler::new(&store, ConfigStore::new(SchedulerConfig::default())).unwrap();
        let janitor = Janitor::new(
            store.clone(),
            scheduler,
            ConfigStore::new(JanitorConfig {
                sweep_expiry: Duration::from_secs(60),
            }),
        )
        .await;
        (store, janitor)
    }

    #[tokio::test]
    async fn test_sweep_deletes_after_expiry() {
        let (store, janitor) = setup().await;
        let level = store.sublevel("things").unwrap();
        level.put("a", &1u32).unwrap();
        level.put("b", &2u32).unwrap();

        let now = OffsetDateTime::now_utc();
        janitor
            .schedule_at(
                vec![
                    JanitorTask::new("things", "a"),
                    JanitorTask::new("things", "b").with_expiry(Duration::from_secs(1)),
                ],
                now,
            )
            .await
            .unwrap();

        let scheduler = janitor.scheduler();
        scheduler
            .fire_due_at(now + Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(level.get::<u32>("a").unwrap(), Some(1));
        assert_eq!(level.get::<u32>("b").unwrap(), None);

        scheduler
            .fire_due_at(now + Duration::from_secs(61))
            .await
            .unwrap();
        assert!(level.is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_and_sublevel_are_handled() {
        let (store, janitor) = setup().await;
        let level = store.sublevel("things").unwrap();
        level.put("present", &1u32).unwrap();

        let now = OffsetDateTime::now_utc();
        let expiry = Duration::from_secs(1);
        janitor
            .schedule_at(
                vec![
                    JanitorTask::new("things", "absent").with_expiry(expiry),
                    JanitorTask::new("dropped", "x").with_expiry(expiry),
                    JanitorTask::new("things", "present").with_expiry(expiry),
                ],
                now,
            )
            .await
            .unwrap();

        let report = janitor
            .scheduler()
            .fire_due_at(now + Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(report.fired, 3);
        assert_eq!(report.failed, 0);
        assert!(level.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_only_deletes_entries_it_owns() {
        let (store, janitor) = setup().await;
        let level = store.sublevel("things").unwrap();

        let now = OffsetDateTime::now_utc();
        let keys = janitor
            .schedule_at(
                vec![
                    JanitorTask::new("things", "stale"),
                    JanitorTask::new("things", "owned"),
                ],
                now,
            )
            .await
            .unwrap();
        // "stale" was replaced after its sweep was scheduled.
        level
            .put(
                "stale",
                &serde_json::json!({"message": 1, "expiryTask": "newer", "storedAt": 0}),
            )
            .unwrap();
        level
            .put(
                "owned",
                &serde_json::json!({"message": 2, "expiryTask": keys[1], "storedAt": 0}),
            )
            .unwrap();

        let report = janitor
            .scheduler()
            .fire_due_at(now + Duration::from_secs(61))
            .await
            .unwrap();
        assert_eq!(report.fired, 2);
        assert!(level.get::<serde_json::Value>("stale").unwrap().is_some());
        assert!(level.get::<serde_json::Value>("owned").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_sweep_keeps_entry() {
        let (store, janitor) = setup().await;
        let level = store.sublevel("things").unwrap();
        level.put("a", &1u32).unwrap();

        let now = OffsetDateTime::now_utc();
        let keys = janitor
            .schedule_at(vec![JanitorTask::new("things", "a")], now)
            .await
            .unwrap();
        assert!(janitor.cancel(&keys[0]).await.unwrap());

        janitor
            .scheduler()
            .fire_due_at(now + Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(level.get::<u32>("a").unwrap(), Some(1));
    }
}
