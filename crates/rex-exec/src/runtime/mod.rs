mod local;

pub use local::LocalRuntime;

use std::path::Path;

use async_trait::async_trait;

use rex_model::{Env, Limits};
use rex_observe::LogSink;

use crate::error::RuntimeError;

/// Result of a script that ran to completion inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutcome {
    pub exit_status: i32,
    /// Bounded tail of stderr, kept for failure reporting.
    pub stderr_tail: String,
}

impl ScriptOutcome {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// The container runtime, as the executor consumes it.
///
/// A handle is owned exclusively by the task that created it until
/// destroyed. `run` streams stdout/stderr lines into the sink as they are
/// produced; `stop` asks the runtime to terminate whatever `handle` is
/// currently running.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn create(&self, limits: &Limits, stack: &str) -> Result<String, RuntimeError>;

    async fn destroy(&self, handle: &str) -> Result<(), RuntimeError>;

    async fn copy_in(
        &self,
        handle: &str,
        src: &Path,
        dst: &str,
        user: &str,
    ) -> Result<(), RuntimeError>;

    async fn copy_out(
        &self,
        handle: &str,
        src: &str,
        dst: &Path,
        user: &str,
    ) -> Result<(), RuntimeError>;

    async fn run(
        &self,
        handle: &str,
        script: &str,
        env: &Env,
        sink: &dyn LogSink,
    ) -> Result<ScriptOutcome, RuntimeError>;

    async fn stop(&self, handle: &str) -> Result<(), RuntimeError>;
}
