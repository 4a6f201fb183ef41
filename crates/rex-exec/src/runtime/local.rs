use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

use rex_model::{Env, Limits};
use rex_observe::LogSink;

use crate::{
    error::RuntimeError,
    runtime::{ContainerRuntime, ScriptOutcome},
};

const STDERR_TAIL_MAX: usize = 1024;

/// Container runtime backed by plain host subprocesses.
///
/// Each handle is a scratch directory under the base dir; scripts run as
/// `sh -c` with that directory as the working directory. Limits are
/// recorded but not enforced. This is the single-node deployment story and
/// the runtime the demo binary wires up.
pub struct LocalRuntime {
    base_dir: PathBuf,
    stops: Mutex<HashMap<String, CancellationToken>>,
}

impl LocalRuntime {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            stops: Mutex::new(HashMap::new()),
        }
    }

    fn root(&self, handle: &str) -> PathBuf {
        self.base_dir.join(handle)
    }

    /// Resolve an absolute in-container path under the handle's root.
    fn rooted(&self, handle: &str, container_path: &str) -> PathBuf {
        self.root(handle).join(container_path.trim_start_matches('/'))
    }

    fn stop_token(&self, handle: &str) -> Result<CancellationToken, RuntimeError> {
        self.stops
            .lock()
            .get(handle)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownHandle(handle.to_string()))
    }
}

#[async_trait]
impl ContainerRuntime for LocalRuntime {
    async fn create(&self, limits: &Limits, stack: &str) -> Result<String, RuntimeError> {
        let handle = format!("c-{}", Uuid::new_v4());
        tokio::fs::create_dir_all(self.root(&handle)).await?;
        self.stops
            .lock()
            .insert(handle.clone(), CancellationToken::new());
        debug!(
            handle = %handle,
            stack = %stack,
            memory_mb = limits.memory_mb,
            disk_mb = limits.disk_mb,
            "created scratch container"
        );
        Ok(handle)
    }

    async fn destroy(&self, handle: &str) -> Result<(), RuntimeError> {
        if let Some(stop) = self.stops.lock().remove(handle) {
            stop.cancel();
        }
        match tokio::fs::remove_dir_all(self.root(handle)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn copy_in(
        &self,
        handle: &str,
        src: &Path,
        dst: &str,
        _user: &str,
    ) -> Result<(), RuntimeError> {
        self.stop_token(handle)?;
        let target = self.rooted(handle, dst);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(src, &target).await?;
        trace!(handle = %handle, dst = %target.display(), "copied file in");
        Ok(())
    }

    async fn copy_out(
        &self,
        handle: &str,
        src: &str,
        dst: &Path,
        _user: &str,
    ) -> Result<(), RuntimeError> {
        self.stop_token(handle)?;
        tokio::fs::copy(self.rooted(handle, src), dst).await?;
        Ok(())
    }

    async fn run(
        &self,
        handle: &str,
        script: &str,
        env: &Env,
        sink: &dyn LogSink,
    ) -> Result<ScriptOutcome, RuntimeError> {
        let stop = self.stop_token(handle)?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(script)
            .current_dir(self.root(handle))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // later entries overwrite earlier ones, preserving last-wins
        for kv in env.iter() {
            cmd.env(kv.name(), kv.value());
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| RuntimeError::Spawn(e.to_string()))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut out_lines = stdout.map(|s| BufReader::new(s).lines());
        let mut err_lines = stderr.map(|s| BufReader::new(s).lines());
        let mut tail = TailBuffer::new(STDERR_TAIL_MAX);

        let mut out_done = out_lines.is_none();
        let mut err_done = err_lines.is_none();
        while !(out_done && err_done) {
            tokio::select! {
                line = next_line(&mut out_lines), if !out_done => match line {
                    Some(line) => sink.stdout_line(&line),
                    None => out_done = true,
                },
                line = next_line(&mut err_lines), if !err_done => match line {
                    Some(line) => {
                        sink.stderr_line(&line);
                        tail.push_line(&line);
                    }
                    None => err_done = true,
                },
                _ = stop.cancelled() => {
                    debug!(handle = %handle, "stop requested; killing script");
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    return Err(RuntimeError::Stopped);
                }
            }
        }

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = stop.cancelled() => {
                debug!(handle = %handle, "stop requested; killing script");
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(RuntimeError::Stopped);
            }
        };

        Ok(ScriptOutcome {
            exit_status: status.code().unwrap_or(-1),
            stderr_tail: tail.into_string(),
        })
    }

    async fn stop(&self, handle: &str) -> Result<(), RuntimeError> {
        self.stop_token(handle)?.cancel();
        Ok(())
    }
}

async fn next_line<R>(lines: &mut Option<tokio::io::Lines<BufReader<R>>>) -> Option<String>
where
    R: tokio::io::AsyncRead + Unpin,
{
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => None,
    }
}

/// Keeps roughly the last `max_bytes` of line-oriented output.
struct TailBuffer {
    lines: std::collections::VecDeque<String>,
    bytes: usize,
    max_bytes: usize,
}

impl TailBuffer {
    fn new(max_bytes: usize) -> Self {
        Self {
            lines: std::collections::VecDeque::new(),
            bytes: 0,
            max_bytes,
        }
    }

    fn push_line(&mut self, line: &str) {
        self.bytes += line.len() + 1;
        self.lines.push_back(line.to_string());
        while self.bytes > self.max_bytes && self.lines.len() > 1 {
            if let Some(evicted) = self.lines.pop_front() {
                self.bytes -= evicted.len() + 1;
            }
        }
    }

    fn into_string(self) -> String {
        self.lines.into_iter().collect::<Vec<_>>().join("\n")
    }
}
