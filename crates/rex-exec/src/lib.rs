mod actions;
mod archive;
mod error;
mod handler;
mod pipeline;
mod runtime;
mod shared;
mod transfer;
mod utils;

pub use actions::{
    DownloadAction, FetchResultAction, NestedContext, RunAction, UploadAction,
    build_nested_actions,
};
pub use error::{RuntimeError, TransferError};
pub use handler::RunOnceHandler;
pub use pipeline::{
    ClaimAction, CompleteAction, CreateContainerAction, ExecuteAction, RegisterAction,
};
pub use runtime::{ContainerRuntime, LocalRuntime, ScriptOutcome};
pub use shared::SharedRunOnce;
pub use transfer::{FileTransport, HttpTransport};

#[cfg(test)]
pub(crate) mod testing;
