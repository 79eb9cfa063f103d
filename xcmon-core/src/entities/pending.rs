use crate::entities::scheduled_task::TASKS_SUBLEVEL;
use crate::framework::StoreProcessor;
use crate::store::StoreError;
use kanau::processor::Processor;
use serde::{Deserialize, Serialize};
use xcmon_sdk::objects::admin::{AdminPendingEntryResponse, clamp_limit};

/// The pending keyspaces. Each is its own sublevel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingNamespace {
    /// Outbound legs waiting for the destination to report.
    AwaitingDestination,
    /// Inbound observations waiting for their outbound leg.
    AwaitingOrigin,
    /// Relay observations waiting for their outbound leg.
    Relayed,
}

impl PendingNamespace {
    pub const ALL: [PendingNamespace; 3] = [
        PendingNamespace::AwaitingDestination,
        PendingNamespace::AwaitingOrigin,
        PendingNamespace::Relayed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PendingNamespace::AwaitingDestination => "pending:awaiting-destination",
            PendingNamespace::AwaitingOrigin => "pending:awaiting-origin",
            PendingNamespace::Relayed => "pending:relayed",
        }
    }
}

impl std::fmt::Display for PendingNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pending namespace: {0}")]
pub struct UnknownNamespace(pub String);

impl std::str::FromStr for PendingNamespace {
    type Err = UnknownNamespace;

    /// Accepts the sublevel name or its last segment (`awaiting-origin`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PendingNamespace::ALL
            .into_iter()
            .find(|ns| {
                let name = ns.as_str();
                name == s || name.strip_prefix("pending:") == Some(s)
            })
            .ok_or_else(|| UnknownNamespace(s.to_owned()))
    }
}

/// A persisted, not yet matched event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRecord<T> {
    pub message: T,
    /// Scheduler key of the single janitor task that expires this entry.
    pub expiry_task: String,
    /// Unix milliseconds.
    pub stored_at: i64,
}

impl<T> PendingRecord<T> {
    pub fn new(message: T, expiry_task: String) -> Self {
        let stored_at = time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        Self {
            message,
            expiry_task,
            stored_at: stored_at as i64,
        }
    }
}

#[derive(Debug, Clone)]
/// List entries of one pending namespace, optionally for one subscription only.
pub struct ListPendingEntries {
    pub namespace: PendingNamespace,
    pub subscription_id: Option<String>,
    pub limit: usize,
}

impl Processor<ListPendingEntries> for StoreProcessor {
    type Output = Vec<AdminPendingEntryResponse>;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "STORE:ListPendingEntries")]
    async fn process(
        &self,
        query: ListPendingEntries,
    ) -> Result<Vec<AdminPendingEntryResponse>, StoreError> {
        let level = self.store.sublevel(query.namespace.as_str())?;
        let prefix = query
            .subscription_id
            .map(|id| format!("{id}:"))
            .unwrap_or_default();
        let entries: Vec<(String, PendingRecord<serde_json::Value>)> =
            level.scan_prefix(&prefix, clamp_limit(query.limit))?;
        Ok(entries
            .into_iter()
            .map(|(key, record)| AdminPendingEntryResponse {
                namespace: query.namespace.as_str().to_owned(),
                key,
                expiry_task: record.expiry_task,
                stored_at: record.stored_at,
                message: record.message,
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
/// Delete one pending entry together with its expiry task.
///
/// Returns false if the entry did not exist.
pub struct DeletePendingEntry {
    pub namespace: PendingNamespace,
    pub key: String,
}

impl Processor<DeletePendingEntry> for StoreProcessor {
    type Output = bool;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "STORE:DeletePendingEntry")]
    async fn process(&self, cmd: DeletePendingEntry) -> Result<bool, StoreError> {
        let level = self.store.sublevel(cmd.namespace.as_str())?;
        let Some(record) = level.take::<PendingRecord<serde_json::Value>>(&cmd.key)? else {
            return Ok(false);
        };
        self.store
            .sublevel(TASKS_SUBLEVEL)?
            .delete(&record.expiry_task)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::entities::scheduled_task::StoredTask;
    use crate::store::Store;

    fn processor() -> StoreProcessor {
        StoreProcessor::new(Store::open(&StoreConfig::temporary()).unwrap())
    }

    fn seed(processor: &StoreProcessor, key: &str, task: &str) {
        let level = processor
            .store
            .sublevel(PendingNamespace::AwaitingOrigin.as_str())
            .unwrap();
        let record = PendingRecord::new(serde_json::json!({"messageHash": key}), task.to_owned());
        level.put(key, &record).unwrap();
        processor
            .store
            .sublevel(TASKS_SUBLEVEL)
            .unwrap()
            .put(
                task,
                &StoredTask {
                    task_type: "janitor.sweep".to_owned(),
                    payload: serde_json::Value::Null,
                },
            )
            .unwrap();
    }

    #[test]
    fn test_namespace_parsing() {
        assert_eq!(
            "pending:relayed".parse::<PendingNamespace>().unwrap(),
            PendingNamespace::Relayed
        );
        assert_eq!(
            "awaiting-origin".parse::<PendingNamespace>().unwrap(),
            PendingNamespace::AwaitingOrigin
        );
        assert!("pending".parse::<PendingNamespace>().is_err());
    }

    #[tokio::test]
    async fn test_list_filters_by_subscription() {
        let processor = processor();
        seed(&processor, "a:k1", "t1");
        seed(&processor, "a:k2", "t2");
        seed(&processor, "b:k1", "t3");

        let all = processor
            .process(ListPendingEntries {
                namespace: PendingNamespace::AwaitingOrigin,
                subscription_id: None,
                limit: 100,
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let only_a = processor
            .process(ListPendingEntries {
                namespace: PendingNamespace::AwaitingOrigin,
                subscription_id: Some("a".to_owned()),
                limit: 100,
            })
            .await
            .unwrap();
        assert_eq!(only_a.len(), 2);
        assert_eq!(only_a[0].expiry_task, "t1");

        // Zero is clamped up, not treated as "no limit".
        let one = processor
            .process(ListPendingEntries {
                namespace: PendingNamespace::AwaitingOrigin,
                subscription_id: None,
                limit: 0,
            })
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_expiry_task() {
        let processor = processor();
        seed(&processor, "a:k1", "t1");

        let deleted = processor
            .process(DeletePendingEntry {
                namespace: PendingNamespace::AwaitingOrigin,
                key: "a:k1".to_owned(),
            })
            .await
            .unwrap();
        assert!(deleted);
        assert!(processor.store.sublevel(TASKS_SUBLEVEL).unwrap().is_empty());

        let again = processor
            .process(DeletePendingEntry {
                namespace: PendingNamespace::AwaitingOrigin,
                key: "a:k1".to_owned(),
            })
            .await
            .unwrap();
        assert!(!again);
    }
}
