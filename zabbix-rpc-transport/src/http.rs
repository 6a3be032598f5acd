use crate::{RpcTransport, TransportError};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client as HttpClient;
use std::time::Duration;
use tracing::{debug, trace, warn};

pub const CONTENT_TYPE_JSON_RPC: &str = "application/json-rpc";

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Upper bound for a whole call, body included.
    pub timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Posts each envelope as its own HTTP request.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: HttpClient,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let http_client = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            http_client,
            timeout: config.timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Request {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, url: &str, body: Bytes) -> Result<Bytes, TransportError> {
        debug!("POST {} ({} bytes)", url, body.len());

        let mut response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON_RPC)
            .body(body)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("HTTP error {} from {}", status, url);
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Content-Length is absent for chunked responses, so drain the
        // body until the stream ends instead of sizing a read from it.
        let mut buf = BytesMut::with_capacity(8 * 1024);
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => buf.put_slice(&chunk),
                Ok(None) => break,
                Err(e) if e.is_timeout() => return Err(TransportError::Timeout(self.timeout)),
                Err(e) => return Err(TransportError::Body(e)),
            }
        }

        trace!("Received {} bytes from {}", buf.len(), url);
        Ok(buf.freeze())
    }
}
