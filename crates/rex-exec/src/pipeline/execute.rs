use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use rex_core::{Action, ActionError, ActionResult, ActionRunner};
use rex_store::ExecutorBbs;

use crate::{
    actions::{NestedContext, build_nested_actions},
    shared::SharedRunOnce,
};

/// Mark the task running and drive its nested action tree to completion.
///
/// A nested-action failure is the task's own failure: it is recorded on the
/// record as `failed` / `failureReason` and does NOT fail the pipeline, so
/// completion still gets reported. Cancellation propagates to the inner
/// runner through a child token and is re-raised as [`ActionError::Cancelled`].
pub struct ExecuteAction {
    bbs: Arc<ExecutorBbs>,
    shared: SharedRunOnce,
    nested: NestedContext,
}

impl ExecuteAction {
    pub fn new(bbs: Arc<ExecutorBbs>, shared: SharedRunOnce, nested: NestedContext) -> Self {
        Self {
            bbs,
            shared,
            nested,
        }
    }
}

#[async_trait]
impl Action for ExecuteAction {
    fn name(&self) -> &'static str {
        "execute"
    }

    async fn perform(&mut self, cancel: &CancellationToken) -> ActionResult {
        let guid = self.shared.guid();
        let handle = self
            .shared
            .snapshot()
            .container_handle
            .ok_or_else(|| ActionError::Internal("execute without a container".into()))?;

        let started = self
            .bbs
            .start_run_once(&guid, &handle)
            .await
            .map_err(|e| ActionError::Store(e.to_string()))?;
        self.shared.update(|record| record.state = started.state);
        debug!(guid = %guid, handle = %handle, "task is running");

        let actions = build_nested_actions(&self.shared, &handle, &self.nested);
        let runner = ActionRunner::with_cancel(actions, cancel.child_token());
        let (results_tx, mut results) = mpsc::channel(1);
        runner.perform(results_tx).await;

        let outcome = results
            .recv()
            .await
            .unwrap_or_else(|| Err(ActionError::Internal("inner runner published nothing".into())));

        match outcome {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Err(ActionError::Cancelled),
            Err(e) => {
                info!(guid = %guid, reason = %e, "task body failed");
                self.shared.update(|record| {
                    record.failed = true;
                    record.failure_reason = e.to_string();
                });
                Ok(())
            }
        }
    }

    async fn cleanup(&mut self) {}
}
