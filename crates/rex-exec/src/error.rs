use thiserror::Error;

use rex_core::ActionError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown container handle: {0}")]
    UnknownHandle(String),

    #[error("failed to spawn script: {0}")]
    Spawn(String),

    #[error("script was stopped")]
    Stopped,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TransferError {
    fn from(e: reqwest::Error) -> Self {
        TransferError::Request(e.to_string())
    }
}

impl From<RuntimeError> for ActionError {
    fn from(e: RuntimeError) -> Self {
        ActionError::Runtime(e.to_string())
    }
}

impl From<TransferError> for ActionError {
    fn from(e: TransferError) -> Self {
        ActionError::Transfer(e.to_string())
    }
}
