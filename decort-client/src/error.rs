//! Client error classification

use decort_core::error::{ErrorKind, ProviderError};
use thiserror::Error;

/// Error produced by the API client.
///
/// The classification drives retry policy: `Transport` and 5xx `Http` errors
/// are retried up to the configured bound, `Auth` triggers exactly one
/// re-login, everything else surfaces immediately.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network-level failure: connect, TLS, or mid-body error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status with the decoded response body.
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    /// The platform rejected our credentials even after a re-login.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The reconciliation context was cancelled mid-call.
    #[error("request cancelled")]
    Cancelled,

    /// The per-call deadline elapsed before a response arrived.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The response body did not parse into the expected shape.
    #[error("response decoding failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// An asynchronous platform task finished with an error.
    #[error("task {task_id} failed: {message}")]
    Task { task_id: String, message: String },
}

impl ClientError {
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let body = if body.len() > 512 {
            let truncated: String = body.chars().take(512).collect();
            format!("{truncated}...")
        } else {
            body
        };
        ClientError::Http { status, body }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Http { status: 404, .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Http { status: 401, .. } | ClientError::Auth(_))
    }
}

impl From<ClientError> for ProviderError {
    fn from(err: ClientError) -> Self {
        let kind = match &err {
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Http { status: 404, .. } => ErrorKind::NotFound,
            ClientError::Http { status, .. } if *status >= 500 => ErrorKind::Transport,
            ClientError::Http { .. } => ErrorKind::Conflict,
            ClientError::Auth(_) => ErrorKind::Fatal,
            ClientError::Cancelled | ClientError::DeadlineExceeded => ErrorKind::Cancelled,
            ClientError::Decode(_) => ErrorKind::Fatal,
            ClientError::Task { .. } => ErrorKind::AsyncTask,
        };
        ProviderError::new(kind, err.to_string()).with_cause(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        assert!(ClientError::http(500, "oops").is_retryable());
        assert!(ClientError::http(503, "busy").is_retryable());
        assert!(!ClientError::http(404, "gone").is_retryable());
        assert!(!ClientError::http(409, "conflict").is_retryable());
        assert!(!ClientError::Cancelled.is_retryable());
    }

    #[test]
    fn not_found_maps_to_provider_kind() {
        let err: ProviderError = ClientError::http(404, "no such compute").into();
        assert!(err.is_not_found());
        let err: ProviderError = ClientError::http(409, "rg not empty").into();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[test]
    fn long_bodies_are_truncated() {
        let err = ClientError::http(500, "x".repeat(2000));
        if let ClientError::Http { body, .. } = &err {
            assert!(body.len() < 600);
        } else {
            panic!("expected http error");
        }
    }
}
