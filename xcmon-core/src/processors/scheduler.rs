//! Scheduler processor.
//!
//! The Scheduler is a persistent delayed-dispatch queue:
//! - Tasks are stored in the `sched:tasks` sublevel under keys that sort by
//!   due time (see [`crate::utils::task_key`])
//! - A tick loop wakes every `frequency`, scans all keys below the current
//!   time, deletes each task and hands it to the listener registered for its
//!   type
//! - One failing task never stops the rest of the sweep
//!
//! Tasks already in the store are picked up by the first tick after a
//! restart, so nothing scheduled is lost across process restarts.

use crate::config::{ConfigStore, SchedulerConfig};
use crate::entities::{ScheduledTask, StoredTask, TASKS_SUBLEVEL};
use crate::store::{Store, StoreError, Sublevel};
use crate::utils::task_key::due_bound;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("scheduler is already running")]
    AlreadyRunning,
}

/// Why a single task could not be handled.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no listener registered for task type {0}")]
    NoListener(String),
    #[error("invalid task payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("task failed: {0}")]
    Failed(String),
}

/// Handles due tasks of one type.
#[async_trait]
pub trait TaskListener: Send + Sync {
    async fn on_task(&self, task: &ScheduledTask) -> Result<(), DispatchError>;
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub fired: usize,
    pub failed: usize,
}

/// Handle to the scheduler. Clones share the same queue and listeners.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    tasks: Sublevel,
    config: ConfigStore<SchedulerConfig>,
    listeners: RwLock<HashMap<String, Arc<dyn TaskListener>>>,
    running: Mutex<Option<TickLoop>>,
}

struct TickLoop {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    pub fn new(store: &Store, config: ConfigStore<SchedulerConfig>) -> Result<Self, StoreError> {
        Ok(Self {
            inner: Arc::new(SchedulerInner {
                tasks: store.sublevel(TASKS_SUBLEVEL)?,
                config,
                listeners: RwLock::new(HashMap::new()),
                running: Mutex::new(None),
            }),
        })
    }

    /// Registers `listener` for `task_type`, replacing any previous one.
    pub async fn on(&self, task_type: impl Into<String>, listener: Arc<dyn TaskListener>) {
        let task_type = task_type.into();
        debug!(%task_type, "Registering task listener");
        self.inner
            .listeners
            .write()
            .await
            .insert(task_type, listener);
    }

    /// Persists all tasks in one batch.
    pub async fn schedule(&self, tasks: Vec<ScheduledTask>) -> Result<(), SchedulerError> {
        if tasks.is_empty() {
            return Ok(());
        }
        let count = tasks.len();
        let entries: Vec<(String, StoredTask)> =
            tasks.into_iter().map(ScheduledTask::into_stored).collect();
        self.inner.tasks.insert_batch(&entries)?;
        debug!(count, "Scheduled tasks");
        Ok(())
    }

    /// Cancels a task. Returns false if it was not (or no longer) scheduled.
    pub async fn remove(&self, key: &str) -> Result<bool, SchedulerError> {
        Ok(self.inner.tasks.delete(key)?)
    }

    /// Number of tasks waiting in the store.
    pub fn scheduled_count(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Spawns the tick loop.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut running = self.inner.running.lock().await;
        if running.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(self.clone().run(shutdown_rx));
        *running = Some(TickLoop {
            shutdown_tx,
            handle,
        });
        info!("Scheduler started");
        Ok(())
    }

    /// Stops the tick loop and waits for the current sweep to finish.
    ///
    /// Does nothing if the scheduler is not running.
    pub async fn stop(&self) {
        let Some(tick_loop) = self.inner.running.lock().await.take() else {
            return;
        };
        let _ = tick_loop.shutdown_tx.send(true);
        if let Err(e) = tick_loop.handle.await {
            error!(error = %e, "Scheduler tick loop ended abnormally");
        }
        info!("Scheduler stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.inner.running.lock().await.is_some()
    }

    /// Runs one sweep as if the current time were `now`.
    ///
    /// Every task whose key sorts below `now` is deleted, then dispatched.
    /// Dispatch failures are logged and counted, never propagated.
    pub async fn fire_due_at(&self, now: OffsetDateTime) -> Result<TickReport, SchedulerError> {
        let bound = due_bound(now);
        let due = self.inner.tasks.raw_before(&bound)?;
        let mut report = TickReport::default();

        for (key, value) in due {
            // Delete before dispatch; a concurrent remove or sweep may have won.
            match self.inner.tasks.delete(&key) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    error!(%key, error = %e, "Failed to delete due task");
                    report.failed += 1;
                    continue;
                }
            }

            let result = match serde_json::from_slice::<StoredTask>(&value) {
                Ok(stored) => {
                    let task = ScheduledTask::from_stored(key.clone(), stored);
                    self.dispatch(&task).await
                }
                Err(e) => Err(DispatchError::Payload(e)),
            };

            match result {
                Ok(()) => report.fired += 1,
                Err(e) => {
                    error!(%key, error = %e, "Scheduled task failed");
                    report.failed += 1;
                }
            }
        }

        if report.fired > 0 || report.failed > 0 {
            debug!(fired = report.fired, failed = report.failed, "Scheduler sweep done");
        }
        Ok(report)
    }

    async fn dispatch(&self, task: &ScheduledTask) -> Result<(), DispatchError> {
        let listener = self
            .inner
            .listeners
            .read()
            .await
            .get(&task.task_type)
            .cloned()
            .ok_or_else(|| DispatchError::NoListener(task.task_type.clone()))?;
        listener.on_task(task).await
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut config_rx = self.inner.config.watch();
        let mut frequency = config_rx.borrow_and_update().frequency;
        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        debug!("Scheduler tick loop received shutdown signal");
                        break;
                    }
                }

                // A reload restarts the wait with the new frequency.
                Ok(()) = config_rx.changed() => {
                    frequency = config_rx.borrow_and_update().frequency;
                    debug!(?frequency, "Scheduler frequency reloaded");
                }

                _ = tokio::time::sleep(frequency) => {
                    if let Err(e) = self.fire_due_at(OffsetDateTime::now_utc()).await {
                        warn!(error = %e, "Scheduler sweep failed");
                    }
                }
            }
        }
    }
}
