//! The nested actions a run-once performs inside its container.
mod download;
mod fetch_result;
mod run;
mod upload;

pub use download::DownloadAction;
pub use fetch_result::FetchResultAction;
pub use run::RunAction;
pub use upload::UploadAction;

use std::{future::Future, path::PathBuf, sync::Arc};

use tokio_util::sync::CancellationToken;

use rex_core::{ActionError, BoxedAction};
use rex_model::ExecutorAction;
use rex_observe::LogSink;

use crate::{runtime::ContainerRuntime, shared::SharedRunOnce, transfer::FileTransport};

/// Dependencies every nested action draws on.
#[derive(Clone)]
pub struct NestedContext {
    pub runtime: Arc<dyn ContainerRuntime>,
    pub transport: Arc<dyn FileTransport>,
    pub sink: Arc<dyn LogSink>,
    /// Host directory for per-action scratch files.
    pub temp_dir: PathBuf,
    /// User container files are copied in and out as.
    pub user: String,
}

/// Instantiate the runtime actions for a task's nested action tree, bound to
/// the container it runs in.
pub fn build_nested_actions(
    shared: &SharedRunOnce,
    container_handle: &str,
    ctx: &NestedContext,
) -> Vec<BoxedAction> {
    shared
        .snapshot()
        .actions
        .into_iter()
        .map(|action| match action {
            ExecutorAction::Download(args) => {
                Box::new(DownloadAction::new(args, container_handle, ctx)) as BoxedAction
            }
            ExecutorAction::Upload(args) => {
                Box::new(UploadAction::new(args, container_handle, ctx)) as BoxedAction
            }
            ExecutorAction::Run(args) => {
                Box::new(RunAction::new(args, container_handle, ctx)) as BoxedAction
            }
            ExecutorAction::FetchResult(args) => Box::new(FetchResultAction::new(
                args,
                container_handle,
                ctx,
                shared.clone(),
            )) as BoxedAction,
        })
        .collect()
}

/// Run `work` unless `cancel` fires first. Cancellation wins ties, so a
/// token that fired before the call never starts the work.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    work: impl Future<Output = Result<T, ActionError>>,
) -> Result<T, ActionError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ActionError::Cancelled),
        result = work => result,
    }
}

/// Best-effort removal of a scratch file recorded by a nested action.
pub(crate) async fn remove_scratch(path: Option<PathBuf>) {
    if let Some(path) = path {
        let _ = tokio::fs::remove_file(path).await;
    }
}
