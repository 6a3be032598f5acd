use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("request cancelled")]
    Cancelled,
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// One request, one response. Implementations must not retry.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Posts `body` to `url` and returns the complete response body.
    async fn send(&self, url: &str, body: Bytes) -> Result<Bytes, TransportError>;
}
