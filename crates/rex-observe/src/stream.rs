use tracing::info;

/// Destination for a running script's output, one call per line.
///
/// Implementations must be cheap and non-blocking; the container runtime
/// calls them from its streaming loop.
pub trait LogSink: Send + Sync {
    fn stdout_line(&self, line: &str);
    fn stderr_line(&self, line: &str);
}

/// Attributes streamed lines to a task's log source via tracing.
///
/// Stand-in for a remote log emitter: every line becomes a structured event
/// under the `task_log` target carrying the source guid and name.
pub struct LogStreamer {
    guid: String,
    source_name: String,
}

impl LogStreamer {
    pub fn new(guid: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            source_name: source_name.into(),
        }
    }
}

impl LogSink for LogStreamer {
    fn stdout_line(&self, line: &str) {
        info!(
            target: "task_log",
            guid = %self.guid,
            source = %self.source_name,
            stream = "stdout",
            "{line}"
        );
    }

    fn stderr_line(&self, line: &str) {
        info!(
            target: "task_log",
            guid = %self.guid,
            source = %self.source_name,
            stream = "stderr",
            "{line}"
        );
    }
}

/// Sink for tasks with no log source configured.
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
    fn stdout_line(&self, _line: &str) {}
    fn stderr_line(&self, _line: &str) {}
}
