use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use rex_core::{Action, ActionError, ActionResult};
use rex_model::RunArgs;
use rex_observe::LogSink;

use crate::{actions::NestedContext, runtime::ContainerRuntime};

/// Execute a script inside the container, streaming its output and
/// enforcing the task's timeout.
pub struct RunAction {
    args: RunArgs,
    container_handle: String,
    runtime: Arc<dyn ContainerRuntime>,
    sink: Arc<dyn LogSink>,
}

impl RunAction {
    pub fn new(args: RunArgs, container_handle: &str, ctx: &NestedContext) -> Self {
        Self {
            args,
            container_handle: container_handle.to_string(),
            runtime: Arc::clone(&ctx.runtime),
            sink: Arc::clone(&ctx.sink),
        }
    }
}

#[async_trait]
impl Action for RunAction {
    fn name(&self) -> &'static str {
        "run"
    }

    async fn perform(&mut self, cancel: &CancellationToken) -> ActionResult {
        debug!(handle = %self.container_handle, timeout = ?self.args.timeout, "run action");
        let timeout = self.args.timeout;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = self.runtime.stop(&self.container_handle).await;
                Err(ActionError::Cancelled)
            }
            _ = tokio::time::sleep(timeout), if !timeout.is_zero() => {
                let _ = self.runtime.stop(&self.container_handle).await;
                Err(ActionError::Timeout { after: timeout })
            }
            outcome = self.runtime.run(
                &self.container_handle,
                &self.args.script,
                &self.args.env,
                self.sink.as_ref(),
            ) => {
                let outcome = outcome?;
                if outcome.success() {
                    Ok(())
                } else {
                    Err(ActionError::ScriptFailed {
                        status: outcome.exit_status,
                        stderr_tail: outcome.stderr_tail,
                    })
                }
            }
        }
    }

    async fn cleanup(&mut self) {}
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    use rex_model::{Env, RunArgs};

    use super::*;
    use crate::testing::{CollectingSink, FakeRuntime, FakeTransport, RunBehavior, RuntimeCall};
    use crate::transfer::FileTransport;

    fn context(runtime: &Arc<FakeRuntime>, sink: &Arc<CollectingSink>, dir: &TempDir) -> NestedContext {
        NestedContext {
            runtime: Arc::clone(runtime) as Arc<dyn ContainerRuntime>,
            transport: Arc::new(FakeTransport::default()) as Arc<dyn FileTransport>,
            sink: Arc::clone(sink) as Arc<dyn LogSink>,
            temp_dir: dir.path().to_path_buf(),
            user: "vcap".to_string(),
        }
    }

    fn args(timeout: Duration) -> RunArgs {
        RunArgs {
            script: "echo hi".into(),
            timeout,
            env: Env::new(),
        }
    }

    #[tokio::test]
    async fn a_zero_exit_is_success_and_output_is_streamed() {
        let dir = TempDir::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let sink = Arc::new(CollectingSink::default());
        *runtime.run_behavior.lock() = RunBehavior {
            stdout: vec!["hello".into()],
            ..RunBehavior::default()
        };

        let mut action = RunAction::new(args(Duration::ZERO), "handle-1", &context(&runtime, &sink, &dir));
        action.perform(&CancellationToken::new()).await.unwrap();

        assert_eq!(sink.stdout(), vec!["hello"]);
        assert_eq!(runtime.calls_of(|c| matches!(c, RuntimeCall::Run { .. })), 1);
        assert_eq!(runtime.calls_of(|c| matches!(c, RuntimeCall::Stop { .. })), 0);
    }

    #[tokio::test]
    async fn a_non_zero_exit_carries_status_and_stderr_tail() {
        let dir = TempDir::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let sink = Arc::new(CollectingSink::default());
        *runtime.run_behavior.lock() = RunBehavior {
            stderr: vec!["command not found".into()],
            exit_status: 127,
            ..RunBehavior::default()
        };

        let mut action = RunAction::new(args(Duration::ZERO), "handle-1", &context(&runtime, &sink, &dir));
        let err = action.perform(&CancellationToken::new()).await.unwrap_err();

        match err {
            ActionError::ScriptFailed { status, stderr_tail } => {
                assert_eq!(status, 127);
                assert!(stderr_tail.contains("command not found"));
            }
            other => panic!("expected ScriptFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_stops_the_container_side_and_reports_promptly() {
        let dir = TempDir::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let sink = Arc::new(CollectingSink::default());
        *runtime.run_behavior.lock() = RunBehavior {
            stdout: vec!["about to hang".into()],
            delay: Duration::from_secs(1),
            ..RunBehavior::default()
        };

        let started = Instant::now();
        let mut action = RunAction::new(
            args(Duration::from_millis(10)),
            "handle-1",
            &context(&runtime, &sink, &dir),
        );
        let err = action.perform(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ActionError::Timeout { after } if after == Duration::from_millis(10)));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(runtime.calls_of(|c| matches!(c, RuntimeCall::Stop { .. })), 1);
        // output produced before the hang was streamed
        assert_eq!(sink.stdout(), vec!["about to hang"]);
    }

    #[tokio::test]
    async fn cancellation_stops_the_container_side() {
        let dir = TempDir::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let sink = Arc::new(CollectingSink::default());
        *runtime.run_behavior.lock() = RunBehavior {
            delay: Duration::from_secs(30),
            ..RunBehavior::default()
        };

        let cancel = CancellationToken::new();
        let mut action = RunAction::new(args(Duration::ZERO), "handle-1", &context(&runtime, &sink, &dir));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = action.perform(&cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(runtime.calls_of(|c| matches!(c, RuntimeCall::Stop { .. })), 1);
    }
}
