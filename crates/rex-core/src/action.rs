use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ActionError;

pub type ActionResult = Result<(), ActionError>;
pub type BoxedAction = Box<dyn Action>;

/// A unit of side-effecting work driven by an [`crate::ActionRunner`].
///
/// Lifecycle: performed at most once, cleaned up at most once, and only
/// after `perform` has returned. Returning from `perform` is the one and
/// only result publication for the step.
///
/// Cancellation is the token the runner passes in: an in-flight `perform`
/// must observe it at every suspension point (network, container RPC, file
/// I/O, sleeps) and return within bounded time once it fires. An action
/// with nothing to interrupt simply never polls it.
#[async_trait]
pub trait Action: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Do the step's work.
    async fn perform(&mut self, cancel: &CancellationToken) -> ActionResult;

    /// Release whatever `perform` acquired, whether it succeeded or failed.
    /// Must be idempotent; releases that find nothing to release are fine.
    async fn cleanup(&mut self);
}
