use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Sentinel for any wire payload that does not describe a known
    /// executor action: unknown tag, missing required args, wrong shape.
    #[error("invalid executor action payload")]
    InvalidActionConversion,

    #[error("invalid run-once record: {0}")]
    InvalidRunOnce(String),

    #[error("unknown run-once state: {0}")]
    UnknownState(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
