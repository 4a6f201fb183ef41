mod action;
mod domain;
mod error;
mod task;

pub use action::{DownloadArgs, ExecutorAction, FetchResultArgs, RunArgs, UploadArgs};
pub use domain::{Env, KeyValue, Limits};
pub use error::{ModelError, ModelResult};
pub use task::{LogSource, RunOnce, RunOnceState};

#[cfg(feature = "schema")]
pub use schemars::{JsonSchema, schema_for};

pub mod prelude {
    pub use crate::{
        Env, ExecutorAction, KeyValue, Limits, LogSource, ModelError, ModelResult, RunOnce,
        RunOnceState,
    };
    #[cfg(feature = "schema")]
    pub use schemars::{JsonSchema, schema_for};
}
