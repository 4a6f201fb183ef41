mod http;

pub use http::HttpTransport;

use std::path::Path;

use async_trait::async_trait;

use crate::error::TransferError;

/// Blob transport used by the download and upload actions.
#[async_trait]
pub trait FileTransport: Send + Sync {
    /// GET `url` into the file at `dest`.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), TransferError>;

    /// PUT the file at `src` to `url`. There is no partial-upload recovery;
    /// a failed PUT is the caller's error.
    async fn upload(&self, src: &Path, url: &str) -> Result<(), TransferError>;
}
