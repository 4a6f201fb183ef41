use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use rex_core::{Action, ActionError, ActionResult};
use rex_model::DownloadArgs;

use crate::{
    actions::{NestedContext, cancellable, remove_scratch},
    archive,
    runtime::ContainerRuntime,
    transfer::FileTransport,
    utils::unique_temp_path,
};

/// Fetch a blob onto the host, optionally gunzip it, copy it into the
/// container.
pub struct DownloadAction {
    args: DownloadArgs,
    container_handle: String,
    runtime: Arc<dyn ContainerRuntime>,
    transport: Arc<dyn FileTransport>,
    temp_dir: PathBuf,
    user: String,
    fetched: Option<PathBuf>,
    extracted: Option<PathBuf>,
}

impl DownloadAction {
    pub fn new(args: DownloadArgs, container_handle: &str, ctx: &NestedContext) -> Self {
        Self {
            args,
            container_handle: container_handle.to_string(),
            runtime: Arc::clone(&ctx.runtime),
            transport: Arc::clone(&ctx.transport),
            temp_dir: ctx.temp_dir.clone(),
            user: ctx.user.clone(),
            fetched: None,
            extracted: None,
        }
    }
}

#[async_trait]
impl Action for DownloadAction {
    fn name(&self) -> &'static str {
        "download"
    }

    async fn perform(&mut self, cancel: &CancellationToken) -> ActionResult {
        debug!(handle = %self.container_handle, from = %self.args.from, "download action");

        let fetched = unique_temp_path(&self.temp_dir, "download");
        cancellable(cancel, async {
            self.transport
                .fetch(&self.args.from, &fetched)
                .await
                .map_err(ActionError::from)
        })
        .await?;
        self.fetched = Some(fetched.clone());

        let source = if self.args.extract {
            let extracted = unique_temp_path(&self.temp_dir, "extracted");
            cancellable(cancel, async {
                archive::gunzip(&fetched, &extracted)
                    .await
                    .map_err(|e| ActionError::Archive(e.to_string()))
            })
            .await?;
            self.extracted = Some(extracted.clone());
            extracted
        } else {
            fetched
        };

        cancellable(cancel, async {
            self.runtime
                .copy_in(&self.container_handle, &source, &self.args.to, &self.user)
                .await
                .map_err(ActionError::from)
        })
        .await
    }

    async fn cleanup(&mut self) {
        remove_scratch(self.fetched.take()).await;
        remove_scratch(self.extracted.take()).await;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use flate2::{Compression, write::GzEncoder};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    use rex_model::DownloadArgs;
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

    fn args(extract: bool) -> DownloadArgs {
        DownloadArgs {
            from: "http://blobs/droplet".into(),
            to: "/app/droplet".into(),
            extract,
        }
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[tokio::test]
    async fn fetches_and_copies_into_the_container() {
        let dir = TempDir::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let transport = Arc::new(FakeTransport::default());
        transport
            .blobs
            .lock()
            .insert("http://blobs/droplet".into(), b"droplet bytes".to_vec());

        let mut action = DownloadAction::new(args(false), "handle-1", &context(&runtime, &transport, &dir));
        action.perform(&CancellationToken::new()).await.unwrap();

        assert_eq!(
            runtime.calls_of(|c| matches!(
                c,
                RuntimeCall::CopyIn { handle, dst, contents }
                    if handle == "handle-1" && dst == "/app/droplet" && contents == b"droplet bytes"
            )),
            1
        );

        action.cleanup().await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn extract_gunzips_before_copying_in() {
        let dir = TempDir::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let transport = Arc::new(FakeTransport::default());
        transport
            .blobs
            .lock()
            .insert("http://blobs/droplet".into(), gzip(b"unpacked payload"));

        let mut action = DownloadAction::new(args(true), "handle-1", &context(&runtime, &transport, &dir));
        action.perform(&CancellationToken::new()).await.unwrap();

        assert_eq!(
            runtime.calls_of(|c| matches!(
                c,
                RuntimeCall::CopyIn { contents, .. } if contents == b"unpacked payload"
            )),
            1
        );

        action.cleanup().await;
        action.cleanup().await; // idempotent
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn a_missing_blob_surfaces_as_a_transfer_error() {
        let dir = TempDir::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let transport = Arc::new(FakeTransport::default());

        let mut action = DownloadAction::new(args(false), "handle-1", &context(&runtime, &transport, &dir));
        let err = action.perform(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ActionError::Transfer(_)));
        assert_eq!(runtime.calls_of(|c| matches!(c, RuntimeCall::CopyIn { .. })), 0);
    }

    #[tokio::test]
    async fn a_corrupt_archive_surfaces_as_an_archive_error() {
        let dir = TempDir::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let transport = Arc::new(FakeTransport::default());
        transport
            .blobs
            .lock()
            .insert("http://blobs/droplet".into(), b"not gzip at all".to_vec());

        let mut action = DownloadAction::new(args(true), "handle-1", &context(&runtime, &transport, &dir));
        let err = action.perform(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ActionError::Archive(_)));

        action.cleanup().await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn a_pre_cancelled_token_stops_before_any_work() {
        let dir = TempDir::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let transport = Arc::new(FakeTransport::default());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut action = DownloadAction::new(args(false), "handle-1", &context(&runtime, &transport, &dir));
        let err = action.perform(&cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
