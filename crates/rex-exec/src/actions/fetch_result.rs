use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use rex_core::{Action, ActionError, ActionResult};
use rex_model::FetchResultArgs;

use crate::{
    actions::{NestedContext, cancellable, remove_scratch},
    runtime::ContainerRuntime,
    shared::SharedRunOnce,
    utils::unique_temp_path,
};

/// Largest result file the executor will report.
pub const MAX_RESULT_BYTES: u64 = 10 * 1024;

/// Read a small container file into the task's result slot.
pub struct FetchResultAction {
    args: FetchResultArgs,
    container_handle: String,
    runtime: Arc<dyn ContainerRuntime>,
    temp_dir: PathBuf,
    user: String,
    shared: SharedRunOnce,
    staged: Option<PathBuf>,
}

impl FetchResultAction {
    pub fn new(
        args: FetchResultArgs,
        container_handle: &str,
        ctx: &NestedContext,
        shared: SharedRunOnce,
    ) -> Self {
        Self {
            args,
            container_handle: container_handle.to_string(),
            runtime: Arc::clone(&ctx.runtime),
            temp_dir: ctx.temp_dir.clone(),
            user: ctx.user.clone(),
            shared,
            staged: None,
        }
    }
}

#[async_trait]
impl Action for FetchResultAction {
    fn name(&self) -> &'static str {
        "fetch_result"
    }

    async fn perform(&mut self, cancel: &CancellationToken) -> ActionResult {
        debug!(handle = %self.container_handle, file = %self.args.file, "fetch result action");

        let staged = unique_temp_path(&self.temp_dir, "fetch-result");
        cancellable(cancel, async {
            self.runtime
                .copy_out(&self.container_handle, &self.args.file, &staged, &self.user)
                .await
                .map_err(ActionError::from)
        })
        .await?;
        self.staged = Some(staged.clone());

        let size = tokio::fs::metadata(&staged).await?.len();
        if size > MAX_RESULT_BYTES {
            return Err(ActionError::ResultTooLarge {
                size,
                limit: MAX_RESULT_BYTES,
            });
        }

        let contents = tokio::fs::read_to_string(&staged).await?;
        self.shared.update(|record| record.result = contents);
        Ok(())
    }

    async fn cleanup(&mut self) {
        remove_scratch(self.staged.take()).await;
    }
}
