use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use rex_core::{Action, ActionError, ActionResult};
use rex_store::{ExecutorBbs, StoreError};

use crate::{actions::cancellable, shared::SharedRunOnce};

/// Claim the task in the shared store, stamping this node's executor id.
///
/// Losing the compare-and-swap means another executor owns the task; that is
/// reported as [`ActionError::AlreadyClaimed`], which the handler treats as
/// a no-op completion.
pub struct ClaimAction {
    bbs: Arc<ExecutorBbs>,
    shared: SharedRunOnce,
    executor_id: String,
    claimed: bool,
}

impl ClaimAction {
    pub fn new(bbs: Arc<ExecutorBbs>, shared: SharedRunOnce, executor_id: String) -> Self {
        Self {
            bbs,
            shared,
            executor_id,
            claimed: false,
        }
    }
}

#[async_trait]
impl Action for ClaimAction {
    fn name(&self) -> &'static str {
        "claim"
    }

    async fn perform(&mut self, cancel: &CancellationToken) -> ActionResult {
        let guid = self.shared.guid();

        let claim = cancellable(cancel, async {
            self.bbs
                .claim_run_once(&guid, &self.executor_id)
                .await
                .map_err(|e| match e {
                    // a vanished record is indistinguishable from a lost race
                    StoreError::CompareFailed | StoreError::KeyNotFound => {
                        ActionError::AlreadyClaimed { guid: guid.clone() }
                    }
                    other => ActionError::Store(other.to_string()),
                })
        })
        .await?;

        self.claimed = true;
        self.shared.update(|record| {
            record.state = claim.state;
            record.executor_id = claim.executor_id.clone();
        });
        info!(guid = %guid, executor_id = %self.executor_id, "claimed task");
        Ok(())
    }

    async fn cleanup(&mut self) {
        // Best-effort reversal, and only while the claim is still ours to
        // revert; once the task reached Running the compare fails and the
        // record is left alone.
        if !self.claimed {
            return;
        }
        self.claimed = false;

        let guid = self.shared.guid();
        match self.bbs.unclaim_run_once(&guid).await {
            Ok(()) => {
                self.shared.update(|record| {
                    record.state = rex_model::RunOnceState::Pending;
                    record.executor_id = None;
                });
                debug!(guid = %guid, "released claim");
            }
            Err(e) => debug!(guid = %guid, error = %e, "claim left in place"),
        }
    }
}
