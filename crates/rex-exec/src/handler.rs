use std::{path::PathBuf, sync::Arc};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use rex_core::{ActionError, ActionResult, ActionRunner, BoxedAction, TaskRegistry};
use rex_model::RunOnce;
use rex_observe::{LogSink, LogStreamer, NoopLogSink};
use rex_store::ExecutorBbs;

use crate::{
    actions::NestedContext,
    pipeline::{ClaimAction, CompleteAction, CreateContainerAction, ExecuteAction, RegisterAction},
    runtime::ContainerRuntime,
    shared::SharedRunOnce,
    transfer::FileTransport,
    utils::current_user,
};

/// Drives one run-once task through the five-stage pipeline.
///
/// The handler is pure composition: it builds the action list for the task
/// and hands it to an [`ActionRunner`]; every resource the pipeline acquires
/// is released by the runner's reverse cleanup on every path.
pub struct RunOnceHandler {
    bbs: Arc<ExecutorBbs>,
    runtime: Arc<dyn ContainerRuntime>,
    transport: Arc<dyn FileTransport>,
    registry: Arc<TaskRegistry>,
    stack: String,
    temp_dir: PathBuf,
}

impl RunOnceHandler {
    pub fn new(
        bbs: Arc<ExecutorBbs>,
        runtime: Arc<dyn ContainerRuntime>,
        transport: Arc<dyn FileTransport>,
        registry: Arc<TaskRegistry>,
        stack: impl Into<String>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bbs,
            runtime,
            transport,
            registry,
            stack: stack.into(),
            temp_dir: temp_dir.into(),
        }
    }

    /// Run the task to its terminal result.
    ///
    /// A stack-gated task is skipped without side effects. Cancelling
    /// `cancel` interrupts the in-flight stage and unwinds already-acquired
    /// resources before this returns [`ActionError::Cancelled`].
    #[instrument(skip_all, fields(guid = %run_once.guid))]
    pub async fn run_once(
        &self,
        run_once: RunOnce,
        executor_id: &str,
        cancel: &CancellationToken,
    ) -> ActionResult {
        if !run_once.stack.is_empty() && run_once.stack != self.stack {
            warn!(
                desired_stack = %run_once.stack,
                executor_stack = %self.stack,
                "stack mismatch, skipping task"
            );
            return Ok(());
        }

        let sink: Arc<dyn LogSink> = match &run_once.log {
            Some(source) => Arc::new(LogStreamer::new(
                source.guid.clone(),
                source.source_name.clone(),
            )),
            None => Arc::new(NoopLogSink),
        };

        let shared = SharedRunOnce::new(run_once);
        let nested = NestedContext {
            runtime: Arc::clone(&self.runtime),
            transport: Arc::clone(&self.transport),
            sink,
            temp_dir: self.temp_dir.clone(),
            user: current_user(),
        };

        let actions: Vec<BoxedAction> = vec![
            Box::new(RegisterAction::new(
                Arc::clone(&self.registry),
                shared.clone(),
            )),
            Box::new(ClaimAction::new(
                Arc::clone(&self.bbs),
                shared.clone(),
                executor_id.to_string(),
            )),
            Box::new(CreateContainerAction::new(
                Arc::clone(&self.runtime),
                shared.clone(),
            )),
            Box::new(ExecuteAction::new(
                Arc::clone(&self.bbs),
                shared.clone(),
                nested,
            )),
            Box::new(CompleteAction::new(Arc::clone(&self.bbs), shared.clone())),
        ];

        let runner = ActionRunner::with_cancel(actions, cancel.child_token());
        let (results_tx, mut results) = mpsc::channel(1);
        tokio::spawn(runner.perform(results_tx));

        results
            .recv()
            .await
            .unwrap_or_else(|| Err(ActionError::Internal("runner published nothing".into())))
    }
}
