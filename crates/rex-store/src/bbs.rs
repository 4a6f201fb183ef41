use std::sync::Arc;

use tracing::warn;

use rex_model::{RunOnce, RunOnceState};

use crate::{
    adapter::{StoreAdapter, WatchSubscription},
    error::{StoreError, StoreResult},
    node::{EventType, StoreNode},
};

/// Subtree where run-once records live, one JSON leaf per guid.
pub const RUN_ONCE_ROOT: &str = "/v1/run_once";

/// Run-once bookkeeping over a [`StoreAdapter`].
///
/// Every transition is read, state-checked, then compare-and-swapped against
/// the exact stored bytes, so two executors racing for the same guid resolve
/// to one winner; the loser sees [`StoreError::CompareFailed`].
pub struct ExecutorBbs {
    store: Arc<dyn StoreAdapter>,
}

impl ExecutorBbs {
    pub fn new(store: Arc<dyn StoreAdapter>) -> Self {
        Self { store }
    }

    fn key(guid: &str) -> String {
        format!("{RUN_ONCE_ROOT}/{guid}")
    }

    async fn read(&self, guid: &str) -> StoreResult<(StoreNode, RunOnce)> {
        let node = self.store.get(&Self::key(guid)).await?;
        let record = RunOnce::from_json(&node.value).map_err(|e| StoreError::Corrupt {
            key: node.key.clone(),
            reason: e.to_string(),
        })?;
        Ok((node, record))
    }

    async fn swap(&self, old: StoreNode, record: &RunOnce) -> StoreResult<()> {
        let value = record.to_json().map_err(|e| StoreError::Corrupt {
            key: old.key.clone(),
            reason: e.to_string(),
        })?;
        let new = StoreNode::new(old.key.clone(), value);
        self.store.compare_and_swap(old, new).await
    }

    /// Publish a fresh record. The stored state is forced to `Pending`.
    pub async fn desire_run_once(&self, record: &RunOnce) -> StoreResult<()> {
        let mut desired = record.clone();
        desired.state = RunOnceState::Pending;
        let value = desired.to_json().map_err(|e| StoreError::Corrupt {
            key: Self::key(&desired.guid),
            reason: e.to_string(),
        })?;
        self.store
            .create(StoreNode::new(Self::key(&desired.guid), value))
            .await
    }

    pub async fn get_run_once(&self, guid: &str) -> StoreResult<RunOnce> {
        Ok(self.read(guid).await?.1)
    }

    /// Pending → Claimed, stamping the claiming executor.
    pub async fn claim_run_once(&self, guid: &str, executor_id: &str) -> StoreResult<RunOnce> {
        let (node, mut record) = self.read(guid).await?;
        if record.state != RunOnceState::Pending {
            return Err(StoreError::CompareFailed);
        }
        record.state = RunOnceState::Claimed;
        record.executor_id = Some(executor_id.to_string());
        self.swap(node, &record).await?;
        Ok(record)
    }

    /// Claimed → Pending, releasing the claim. Used when a later pipeline
    /// stage failed before the task started running.
    pub async fn unclaim_run_once(&self, guid: &str) -> StoreResult<()> {
        let (node, mut record) = self.read(guid).await?;
        if record.state != RunOnceState::Claimed {
            return Err(StoreError::CompareFailed);
        }
        record.state = RunOnceState::Pending;
        record.executor_id = None;
        self.swap(node, &record).await
    }

    /// Claimed → Running, stamping the container handle.
    pub async fn start_run_once(
        &self,
        guid: &str,
        container_handle: &str,
    ) -> StoreResult<RunOnce> {
        let (node, mut record) = self.read(guid).await?;
        if record.state != RunOnceState::Claimed {
            return Err(StoreError::CompareFailed);
        }
        record.state = RunOnceState::Running;
        record.container_handle = Some(container_handle.to_string());
        self.swap(node, &record).await?;
        Ok(record)
    }

    /// Running → Completed, attaching the outcome carried on `record`.
    pub async fn complete_run_once(&self, record: &RunOnce) -> StoreResult<()> {
        let (node, mut stored) = self.read(&record.guid).await?;
        if stored.state != RunOnceState::Running {
            return Err(StoreError::CompareFailed);
        }
        stored.state = RunOnceState::Completed;
        stored.result = record.result.clone();
        stored.failed = record.failed;
        stored.failure_reason = record.failure_reason.clone();
        self.swap(node, &stored).await
    }

    /// Watch for newly desired run-onces.
    pub async fn watch_desired(&self) -> StoreResult<DesiredWatch> {
        let inner = self.store.watch(RUN_ONCE_ROOT).await?;
        Ok(DesiredWatch { inner })
    }
}

/// Stream of freshly desired run-once records.
pub struct DesiredWatch {
    inner: WatchSubscription,
}

impl DesiredWatch {
    /// Next desired record; undecodable payloads are logged and skipped.
    pub async fn next(&mut self) -> Option<RunOnce> {
        while let Some(event) = self.inner.next().await {
            if event.event_type != EventType::Create {
                continue;
            }
            match RunOnce::from_json(&event.node.value) {
                Ok(record) => return Some(record),
                Err(e) => {
                    warn!(key = %event.node.key, error = %e, "skipping undecodable desired run-once");
                }
            }
        }
        None
    }

    pub fn stop(&self) {
        self.inner.stop();
    }
}
