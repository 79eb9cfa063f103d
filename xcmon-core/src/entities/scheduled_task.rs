use crate::framework::StoreProcessor;
use crate::store::StoreError;
use kanau::processor::Processor;
use serde::{Deserialize, Serialize};
use xcmon_sdk::objects::admin::{AdminScheduledTaskResponse, clamp_limit};

/// Sublevel holding all scheduler tasks, keyed by due time.
pub const TASKS_SUBLEVEL: &str = "sched:tasks";

/// The value stored under a task key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTask {
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// A task together with its key.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub key: String,
    pub task_type: String,
    pub payload: serde_json::Value,
}

impl ScheduledTask {
    pub fn new(key: String, task_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            key,
            task_type: task_type.into(),
            payload,
        }
    }

    pub fn from_stored(key: String, stored: StoredTask) -> Self {
        Self {
            key,
            task_type: stored.task_type,
            payload: stored.payload,
        }
    }

    pub fn into_stored(self) -> (String, StoredTask) {
        (
            self.key,
            StoredTask {
                task_type: self.task_type,
                payload: self.payload,
            },
        )
    }
}

#[derive(Debug, Clone)]
/// List scheduled tasks in due order.
pub struct ListScheduledTasks {
    /// Start strictly after this key.
    pub after: Option<String>,
    pub limit: usize,
}

impl Processor<ListScheduledTasks> for StoreProcessor {
    type Output = Vec<AdminScheduledTaskResponse>;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "STORE:ListScheduledTasks")]
    async fn process(
        &self,
        query: ListScheduledTasks,
    ) -> Result<Vec<AdminScheduledTaskResponse>, StoreError> {
        let tasks: Vec<(String, StoredTask)> = self
            .store
            .sublevel(TASKS_SUBLEVEL)?
            .scan_after(query.after.as_deref(), clamp_limit(query.limit))?;
        Ok(tasks
            .into_iter()
            .map(|(key, task)| AdminScheduledTaskResponse {
                key,
                task_type: task.task_type,
                payload: task.payload,
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
/// Delete one scheduled task. Returns false if it did not exist.
pub struct DeleteScheduledTask {
    pub key: String,
}

impl Processor<DeleteScheduledTask> for StoreProcessor {
    type Output = bool;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "STORE:DeleteScheduledTask")]
    async fn process(&self, cmd: DeleteScheduledTask) -> Result<bool, StoreError> {
        self.store.sublevel(TASKS_SUBLEVEL)?.delete(&cmd.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::store::Store;

    #[tokio::test]
    async fn test_list_pages_in_key_order() {
        let processor = StoreProcessor::new(Store::open(&StoreConfig::temporary()).unwrap());
        let tasks: Vec<(String, StoredTask)> = ["c", "a", "b"]
            .into_iter()
            .map(|key| {
                ScheduledTask::new(key.to_owned(), "noop", serde_json::Value::Null).into_stored()
            })
            .collect();
        processor
            .store
            .sublevel(TASKS_SUBLEVEL)
            .unwrap()
            .insert_batch(&tasks)
            .unwrap();

        let first = processor
            .process(ListScheduledTasks {
                after: None,
                limit: 2,
            })
            .await
            .unwrap();
        assert_eq!(
            first.iter().map(|t| t.key.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        let rest = processor
            .process(ListScheduledTasks {
                after: Some("b".to_owned()),
                limit: 2,
            })
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].task_type, "noop");

        assert!(
            processor
                .process(DeleteScheduledTask {
                    key: "c".to_owned()
                })
                .await
                .unwrap()
        );
    }
}
