use std::time::Duration;

use thiserror::Error;

/// Terminal error taxonomy for actions and runners.
///
/// `Cancelled` is a sentinel: it marks an externally requested stop, never a
/// task failure, and callers branch on it via [`ActionError::is_cancelled`].
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action cancelled")]
    Cancelled,

    #[error("insufficient resources for task {guid}")]
    InsufficientResources { guid: String },

    #[error("task {guid} is already claimed by another executor")]
    AlreadyClaimed { guid: String },

    #[error("script timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("script exited with status {status}: {stderr_tail}")]
    ScriptFailed { status: i32, stderr_tail: String },

    #[error("result file is {size} bytes, over the {limit} byte limit")]
    ResultTooLarge { size: u64, limit: u64 },

    #[error("store error: {0}")]
    Store(String),

    #[error("container runtime error: {0}")]
    Runtime(String),

    #[error("file transfer error: {0}")]
    Transfer(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ActionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ActionError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::ActionError;

    #[test]
    fn only_the_sentinel_reads_as_cancelled() {
        assert!(ActionError::Cancelled.is_cancelled());
        assert!(!ActionError::Internal("cancelled".into()).is_cancelled());
        assert!(
            !ActionError::AlreadyClaimed {
                guid: "g".into()
            }
            .is_cancelled()
        );
    }

    #[test]
    fn script_failures_carry_status_and_tail() {
        let e = ActionError::ScriptFailed {
            status: 2,
            stderr_tail: "boom".into(),
        };
        assert_eq!(e.to_string(), "script exited with status 2: boom");
    }
}
