use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use rex_core::{Action, ActionError, ActionResult};

use crate::{actions::cancellable, runtime::ContainerRuntime, shared::SharedRunOnce};

/// Create the task's container and stamp its handle on the record.
pub struct CreateContainerAction {
    runtime: Arc<dyn ContainerRuntime>,
    shared: SharedRunOnce,
    handle: Option<String>,
}

impl CreateContainerAction {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, shared: SharedRunOnce) -> Self {
        Self {
            runtime,
            shared,
            handle: None,
        }
    }
}

#[async_trait]
impl Action for CreateContainerAction {
    fn name(&self) -> &'static str {
        "create-container"
    }

    async fn perform(&mut self, cancel: &CancellationToken) -> ActionResult {
        let snapshot = self.shared.snapshot();

        let handle = cancellable(cancel, async {
            self.runtime
                .create(&snapshot.limits(), &snapshot.stack)
                .await
                .map_err(ActionError::from)
        })
        .await?;

        self.handle = Some(handle.clone());
        self.shared
            .update(|record| record.container_handle = Some(handle.clone()));
        info!(guid = %snapshot.guid, handle = %handle, "created container");
        Ok(())
    }

    async fn cleanup(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.runtime.destroy(&handle).await {
                warn!(handle = %handle, error = %e, "container not destroyed");
            }
        }
    }
}
