use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use rex_core::{Action, ActionError, ActionResult};
use rex_model::UploadArgs;

use crate::{
    actions::{NestedContext, cancellable, remove_scratch},
    runtime::ContainerRuntime,
    transfer::FileTransport,
    utils::unique_temp_path,
};

/// Copy a container file out to the host and PUT it to a URL.
pub struct UploadAction {
    args: UploadArgs,
    container_handle: String,
    runtime: Arc<dyn ContainerRuntime>,
    transport: Arc<dyn FileTransport>,
    temp_dir: PathBuf,
    user: String,
    staged: Option<PathBuf>,
}

impl UploadAction {
    pub fn new(args: UploadArgs, container_handle: &str, ctx: &NestedContext) -> Self {
        Self {
            args,
            container_handle: container_handle.to_string(),
            runtime: Arc::clone(&ctx.runtime),
            transport: Arc::clone(&ctx.transport),
            temp_dir: ctx.temp_dir.clone(),
            user: ctx.user.clone(),
            staged: None,
        }
    }
}

#[async_trait]
impl Action for UploadAction {
    fn name(&self) -> &'static str {
        "upload"
    }

    async fn perform(&mut self, cancel: &CancellationToken) -> ActionResult {
        debug!(handle = %self.container_handle, to = %self.args.to, "upload action");

        let staged = unique_temp_path(&self.temp_dir, "upload");
        cancellable(cancel, async {
            self.runtime
                .copy_out(&self.container_handle, &self.args.from, &staged, &self.user)
                .await
                .map_err(ActionError::from)
        })
        .await?;
        self.staged = Some(staged.clone());

        cancellable(cancel, async {
            self.transport
                .upload(&staged, &self.args.to)
                .await
                .map_err(ActionError::from)
        })
        .await
    }

    async fn cleanup(&mut self) {
        remove_scratch(self.staged.take()).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    use rex_model::UploadArgs;
    use rex_observe::NoopLogSink;

    use super::*;
    use crate::testing::{FakeRuntime, FakeTransport, RuntimeCall};

    fn context(runtime: &Arc<FakeRuntime>, transport: &Arc<FakeTransport>, dir: &TempDir) -> NestedContext {
        NestedContext {
            runtime: Arc::clone(runtime) as Arc<dyn ContainerRuntime>,
            transport: Arc::clone(transport) as Arc<dyn FileTransport>,
            sink: Arc::new(NoopLogSink),
            temp_dir: dir.path().to_path_buf(),
            user: "vcap".to_string(),
        }
    }

    fn args() -> UploadArgs {
        UploadArgs {
            from: "/out/result.tgz".into(),
            to: "http://blobs/result".into(),
        }
    }

    #[tokio::test]
    async fn copies_out_and_puts_to_the_url() {
        let dir = TempDir::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let transport = Arc::new(FakeTransport::default());
        runtime
            .files
            .lock()
            .insert("/out/result.tgz".into(), b"result bytes".to_vec());

        let mut action = UploadAction::new(args(), "handle-1", &context(&runtime, &transport, &dir));
        action.perform(&CancellationToken::new()).await.unwrap();

        assert_eq!(
            runtime.calls_of(|c| matches!(
                c,
                RuntimeCall::CopyOut { handle, src } if handle == "handle-1" && src == "/out/result.tgz"
            )),
            1
        );
        assert_eq!(
            transport.uploads.lock().as_slice(),
            &[("http://blobs/result".to_string(), b"result bytes".to_vec())]
        );

        action.cleanup().await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn a_missing_container_file_fails_before_any_upload() {
        let dir = TempDir::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let transport = Arc::new(FakeTransport::default());

        let mut action = UploadAction::new(args(), "handle-1", &context(&runtime, &transport, &dir));
        let err = action.perform(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ActionError::Runtime(_)));
        assert!(transport.uploads.lock().is_empty());
    }
}
