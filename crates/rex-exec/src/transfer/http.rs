use std::path::Path;

use async_trait::async_trait;
use tracing::trace;

use crate::{error::TransferError, transfer::FileTransport};

/// HTTP blob transport over a shared client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileTransport for HttpTransport {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), TransferError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(TransferError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.bytes().await?;
        tokio::fs::write(dest, &body).await?;
        trace!(url = %url, bytes = body.len(), "fetched blob");
        Ok(())
    }

    async fn upload(&self, src: &Path, url: &str) -> Result<(), TransferError> {
        let body = tokio::fs::read(src).await?;
        let bytes = body.len();
        let response = self.client.put(url).body(body).send().await?;
        if !response.status().is_success() {
            return Err(TransferError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        trace!(url = %url, bytes, "uploaded blob");
        Ok(())
    }
}
