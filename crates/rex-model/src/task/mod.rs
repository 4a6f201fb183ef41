use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{
    ExecutorAction, Limits,
    error::{ModelError, ModelResult},
};

/// Where a run-once sits in the shared store's compare-and-swap ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum RunOnceState {
    Pending,
    Claimed,
    Running,
    Completed,
}

impl Default for RunOnceState {
    fn default() -> Self {
        RunOnceState::Pending
    }
}

impl fmt::Display for RunOnceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunOnceState::Pending => "pending",
            RunOnceState::Claimed => "claimed",
            RunOnceState::Running => "running",
            RunOnceState::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for RunOnceState {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(RunOnceState::Pending),
            "claimed" => Ok(RunOnceState::Claimed),
            "running" => Ok(RunOnceState::Running),
            "completed" => Ok(RunOnceState::Completed),
            other => Err(ModelError::UnknownState(other.to_string())),
        }
    }
}

/// Attribution for streamed stdout/stderr lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct LogSource {
    pub guid: String,
    pub source_name: String,
}

/// A one-shot workload record.
///
/// The descriptor fields (`guid`, `stack`, limits, `actions`, `log`) are
/// immutable once desired. The remaining fields are each written exactly
/// once, by the pipeline stage that owns the corresponding side effect:
/// claim stamps `executor_id`, container creation stamps `container_handle`,
/// execution fills `result` / `failed` / `failure_reason`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct RunOnce {
    pub guid: String,

    /// Stack tag gating which nodes may execute this task; empty means any.
    #[serde(default)]
    pub stack: String,

    #[serde(rename = "memoryMB")]
    pub memory_mb: u64,

    #[serde(rename = "diskMB")]
    pub disk_mb: u64,

    /// Nested actions executed in order inside the container.
    #[serde(default)]
    pub actions: Vec<ExecutorAction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogSource>,

    #[serde(default)]
    pub state: RunOnceState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_handle: Option<String>,

    #[serde(default)]
    pub result: String,

    #[serde(default)]
    pub failed: bool,

    #[serde(default)]
    pub failure_reason: String,
}

impl RunOnce {
    /// A fresh pending record with the given descriptor fields.
    pub fn new(guid: impl Into<String>, limits: Limits, actions: Vec<ExecutorAction>) -> Self {
        Self {
            guid: guid.into(),
            stack: String::new(),
            memory_mb: limits.memory_mb,
            disk_mb: limits.disk_mb,
            actions,
            log: None,
            state: RunOnceState::Pending,
            executor_id: None,
            container_handle: None,
            result: String::new(),
            failed: false,
            failure_reason: String::new(),
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = stack.into();
        self
    }

    pub fn with_log(mut self, log: LogSource) -> Self {
        self.log = Some(log);
        self
    }

    pub fn limits(&self) -> Limits {
        Limits::new(self.memory_mb, self.disk_mb)
    }

    pub fn from_json(payload: &[u8]) -> ModelResult<Self> {
        serde_json::from_slice(payload).map_err(|e| ModelError::InvalidRunOnce(e.to_string()))
    }

    pub fn to_json(&self) -> ModelResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ModelError::InvalidRunOnce(e.to_string()))
    }
}
