use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("key not found")]
    KeyNotFound,

    #[error("key already exists")]
    KeyExists,

    #[error("node is a directory")]
    NodeIsDirectory,

    #[error("node is not a directory")]
    NodeIsNotDirectory,

    #[error("store operation timed out")]
    Timeout,

    #[error("compare-and-swap failed")]
    CompareFailed,

    #[error("corrupt record at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("store transport error: {0}")]
    Transport(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
