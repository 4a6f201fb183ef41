//! Sequential driver for a list of actions.
//!
//! Responsibilities:
//! - perform actions in insertion order, one at a time;
//! - on failure, stop and clean up the completed prefix (including the
//!   failing action) in reverse order;
//! - on external cancel, let the in-flight action unwind, discard its
//!   result, clean up the previously completed actions in reverse order;
//! - publish exactly one terminal result, after all cleanup has run.
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, trace};

use crate::{
    action::{ActionResult, BoxedAction},
    error::ActionError,
};

pub struct ActionRunner {
    actions: Vec<BoxedAction>,
    cancel: CancellationToken,
    done: CancellationToken,
}

impl ActionRunner {
    pub fn new(actions: Vec<BoxedAction>) -> Self {
        Self::with_cancel(actions, CancellationToken::new())
    }

    /// Build a runner whose cancellation is linked to `cancel`; cancelling
    /// that token from outside behaves exactly like [`RunnerHandle::cancel`].
    pub fn with_cancel(actions: Vec<BoxedAction>, cancel: CancellationToken) -> Self {
        Self {
            actions,
            cancel,
            done: CancellationToken::new(),
        }
    }

    /// Handle for cancelling this runner from another task.
    pub fn handle(&self) -> RunnerHandle {
        RunnerHandle {
            cancel: self.cancel.clone(),
            done: self.done.clone(),
        }
    }

    /// Drive every action, then publish the single terminal result on
    /// `sink`. Use a buffered sink (capacity 1) so publication never blocks
    /// on the receiver.
    pub async fn perform(mut self, sink: mpsc::Sender<ActionResult>) {
        let outcome = self.drive().await;
        if sink.send(outcome).await.is_err() {
            debug!("terminal result dropped: receiver went away");
        }
        self.done.cancel();
    }

    async fn drive(&mut self) -> ActionResult {
        let mut completed = 0;
        let mut outcome: ActionResult = Ok(());

        for index in 0..self.actions.len() {
            if self.cancel.is_cancelled() {
                outcome = Err(ActionError::Cancelled);
                break;
            }

            let action = &mut self.actions[index];
            trace!(action = action.name(), "performing");
            let result = action.perform(&self.cancel).await;

            if self.cancel.is_cancelled() {
                // An action interrupted mid-flight has its result discarded
                // and is not cleaned up; one that finished before the cancel
                // was observed still joins the cleanup prefix.
                if result.is_ok() {
                    completed = index + 1;
                }
                outcome = Err(ActionError::Cancelled);
                break;
            }

            match result {
                Ok(()) => completed = index + 1,
                Err(e) => {
                    debug!(action = self.actions[index].name(), error = %e, "action failed");
                    // the failing action may hold partial state
                    completed = index + 1;
                    outcome = Err(e);
                    break;
                }
            }
        }

        for action in self.actions[..completed].iter_mut().rev() {
            trace!(action = action.name(), "cleaning up");
            action.cleanup().await;
        }

        outcome
    }
}

/// Cancellation surface of a running [`ActionRunner`].
#[derive(Clone)]
pub struct RunnerHandle {
    cancel: CancellationToken,
    done: CancellationToken,
}

impl RunnerHandle {
    /// Request cancellation. Idempotent; calling after the terminal result
    /// has been published is a no-op.
    ///
    /// The returned future resolves once cleanup has finished and the
    /// terminal result has been published (immediately, if that already
    /// happened).
    pub fn cancel(&self) -> WaitForCancellationFutureOwned {
        self.cancel.cancel();
        self.done.clone().cancelled_owned()
    }

    pub fn is_finished(&self) -> bool {
        self.done.is_cancelled()
    }
}
