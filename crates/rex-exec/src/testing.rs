//! In-process fakes shared by the unit tests in this crate.

use std::{
    collections::HashMap,
    path::Path,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;

use rex_model::{Env, Limits};
use rex_observe::LogSink;

use crate::{
    error::{RuntimeError, TransferError},
    runtime::{ContainerRuntime, ScriptOutcome},
    transfer::FileTransport,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RuntimeCall {
    Create { stack: String, limits: Limits },
    Destroy { handle: String },
    CopyIn { handle: String, dst: String, contents: Vec<u8> },
    CopyOut { handle: String, src: String },
    Run { handle: String, script: String },
    Stop { handle: String },
}

/// What the fake runtime does when asked to run a script.
pub(crate) struct RunBehavior {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    /// Streamed lines come first; the script then "runs" for this long.
    pub delay: Duration,
    pub exit_status: i32,
}

impl Default for RunBehavior {
    fn default() -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            delay: Duration::ZERO,
            exit_status: 0,
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeRuntime {
    calls: Mutex<Vec<RuntimeCall>>,
    handles: AtomicU64,
    /// Container-path → bytes handed out by copy_out.
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub run_behavior: Mutex<RunBehavior>,
    pub fail_create: AtomicBool,
}

impl FakeRuntime {
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().clone()
    }

    pub fn calls_of(&self, pred: impl Fn(&RuntimeCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: RuntimeCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create(&self, limits: &Limits, stack: &str) -> Result<String, RuntimeError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(RuntimeError::Other("create refused".into()));
        }
        self.record(RuntimeCall::Create {
            stack: stack.to_string(),
            limits: *limits,
        });
        let n = self.handles.fetch_add(1, Ordering::SeqCst);
        Ok(format!("fake-handle-{n}"))
    }

    async fn destroy(&self, handle: &str) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::Destroy {
            handle: handle.to_string(),
        });
        Ok(())
    }

    async fn copy_in(
        &self,
        handle: &str,
        src: &Path,
        dst: &str,
        _user: &str,
    ) -> Result<(), RuntimeError> {
        let contents = std::fs::read(src)?;
        self.record(RuntimeCall::CopyIn {
            handle: handle.to_string(),
            dst: dst.to_string(),
            contents,
        });
        Ok(())
    }

    async fn copy_out(
        &self,
        handle: &str,
        src: &str,
        dst: &Path,
        _user: &str,
    ) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::CopyOut {
            handle: handle.to_string(),
            src: src.to_string(),
        });
        let contents = self
            .files
            .lock()
            .get(src)
            .cloned()
            .ok_or_else(|| RuntimeError::Other(format!("no such container file: {src}")))?;
        std::fs::write(dst, contents)?;
        Ok(())
    }

    async fn run(
        &self,
        handle: &str,
        script: &str,
        _env: &Env,
        sink: &dyn LogSink,
    ) -> Result<ScriptOutcome, RuntimeError> {
        self.record(RuntimeCall::Run {
            handle: handle.to_string(),
            script: script.to_string(),
        });
        let (stdout, stderr, delay, exit_status) = {
            let behavior = self.run_behavior.lock();
            (
                behavior.stdout.clone(),
                behavior.stderr.clone(),
                behavior.delay,
                behavior.exit_status,
            )
        };
        for line in &stdout {
            sink.stdout_line(line);
        }
        for line in &stderr {
            sink.stderr_line(line);
        }
        tokio::time::sleep(delay).await;
        Ok(ScriptOutcome {
            exit_status,
            stderr_tail: stderr.join("\n"),
        })
    }

    async fn stop(&self, handle: &str) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::Stop {
            handle: handle.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeTransport {
    /// URL → bytes served on fetch.
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
    /// (URL, bytes) captured on upload.
    pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl FileTransport for FakeTransport {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), TransferError> {
        let blob = self
            .blobs
            .lock()
            .get(url)
            .cloned()
            .ok_or(TransferError::Status {
                status: 404,
                url: url.to_string(),
            })?;
        std::fs::write(dest, blob)?;
        Ok(())
    }

    async fn upload(&self, src: &Path, url: &str) -> Result<(), TransferError> {
        let bytes = std::fs::read(src)?;
        self.uploads.lock().push((url.to_string(), bytes));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct CollectingSink {
    lines: Mutex<Vec<(&'static str, String)>>,
}

impl CollectingSink {
    pub fn stdout(&self) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(stream, _)| *stream == "stdout")
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn stderr(&self) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(stream, _)| *stream == "stderr")
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl LogSink for CollectingSink {
    fn stdout_line(&self, line: &str) {
        self.lines.lock().push(("stdout", line.to_string()));
    }

    fn stderr_line(&self, line: &str) {
        self.lines.lock().push(("stderr", line.to_string()));
    }
}
