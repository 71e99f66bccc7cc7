//! Batch transport trait and the reqwest implementation

use crate::config::EndpointConfig;
use crate::domain::TransportError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// One encoded batch ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// Batch endpoint URL
    pub url: String,

    /// `multipart/mixed; boundary=...`
    pub content_type: String,

    /// Multipart body
    pub body: String,
}

/// Raw batch response, kept as text so multipart framing survives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResponse {
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    pub body: String,
}

impl BatchResponse {
    /// Whether the batch call itself returned 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends encoded batches to a remote endpoint
///
/// Implementations return `Ok` for any HTTP response, whatever its status;
/// `Err` means no response was obtained.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    /// POST one batch with a bearer token
    async fn send(
        &self,
        request: &BatchRequest,
        bearer_token: &str,
    ) -> Result<BatchResponse, TransportError>;
}

/// [`BatchTransport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the given request timeout
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientSetup`] if the TLS backend cannot be
    /// initialized.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("classroom-batch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::ClientSetup(e.to_string()))?;

        Ok(Self { client })
    }

    /// Create a transport from endpoint configuration
    pub fn from_config(config: &EndpointConfig) -> Result<Self, TransportError> {
        Self::new(Duration::from_secs(config.timeout_seconds))
    }
}

#[async_trait]
impl BatchTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &BatchRequest,
        bearer_token: &str,
    ) -> Result<BatchResponse, TransportError> {
        let response = self
            .client
            .post(&request.url)
            .bearer_auth(bearer_token)
            .header(CONTENT_TYPE, &request.content_type)
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(e.to_string())
                } else {
                    TransportError::ConnectionFailed(e.to_string())
                }
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::BodyRead(e.to_string()))?;

        tracing::debug!(
            status_code = status.as_u16(),
            bytes = body.len(),
            "Batch response received"
        );

        Ok(BatchResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            body,
        })
    }
}
