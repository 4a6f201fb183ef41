use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use rex_core::{Action, ActionResult, TaskRegistry};

use crate::shared::SharedRunOnce;

/// Reserve the task's memory and disk in the node-local registry.
pub struct RegisterAction {
    registry: Arc<TaskRegistry>,
    shared: SharedRunOnce,
}

impl RegisterAction {
    pub fn new(registry: Arc<TaskRegistry>, shared: SharedRunOnce) -> Self {
        Self { registry, shared }
    }
}

#[async_trait]
impl Action for RegisterAction {
    fn name(&self) -> &'static str {
        "register"
    }

    async fn perform(&mut self, _cancel: &CancellationToken) -> ActionResult {
        let snapshot = self.shared.snapshot();
        self.registry.add_run_once(&snapshot)?;
        info!(
            guid = %snapshot.guid,
            memory_mb = snapshot.memory_mb,
            disk_mb = snapshot.disk_mb,
            "reserved resources"
        );
        Ok(())
    }

    async fn cleanup(&mut self) {
        self.registry.remove_run_once(&self.shared.guid());
    }
}
