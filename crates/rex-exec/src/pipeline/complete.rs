use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use rex_core::{Action, ActionResult};
use rex_model::RunOnceState;
use rex_store::ExecutorBbs;

use crate::shared::SharedRunOnce;

/// Report the task's terminal state to the shared store.
///
/// Reporting is best effort by contract: a store error here is logged and
/// swallowed so it can never undo work the task already performed.
pub struct CompleteAction {
    bbs: Arc<ExecutorBbs>,
    shared: SharedRunOnce,
}

impl CompleteAction {
    pub fn new(bbs: Arc<ExecutorBbs>, shared: SharedRunOnce) -> Self {
        Self { bbs, shared }
    }
}

#[async_trait]
impl Action for CompleteAction {
    fn name(&self) -> &'static str {
        "complete"
    }

    async fn perform(&mut self, _cancel: &CancellationToken) -> ActionResult {
        let snapshot = self.shared.snapshot();
        match self.bbs.complete_run_once(&snapshot).await {
            Ok(()) => {
                self.shared
                    .update(|record| record.state = RunOnceState::Completed);
                info!(
                    guid = %snapshot.guid,
                    failed = snapshot.failed,
                    "task completed"
                );
            }
            Err(e) => {
                warn!(guid = %snapshot.guid, error = %e, "completion not reported");
            }
        }
        Ok(())
    }

    async fn cleanup(&mut self) {}
}
