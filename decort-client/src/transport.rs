//! HTTP transport seam
//!
//! The raw transport is an injected capability: production wires in the
//! reqwest-backed [`HttpTransport`], tests substitute a recording mock. The
//! transport does not retry and does not interpret statuses; both belong to
//! the client on top of it.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::form::Form;

/// Status and decoded body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One-shot form POST against an absolute URL.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_form(
        &self,
        url: &str,
        bearer: Option<&str>,
        form: &Form,
    ) -> Result<TransportResponse, ClientError>;
}

/// Production transport over a shared reqwest client.
#[derive(Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_form(
        &self,
        url: &str,
        bearer: Option<&str>,
        form: &Form,
    ) -> Result<TransportResponse, ClientError> {
        let mut request = self.client.post(url).form(form.entries());
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}
