//! Error type shared by all lifecycle handlers

use thiserror::Error;

/// Broad classification of a handler failure.
///
/// The kind tells the caller (and the status-driven recovery logic) whether
/// a retry, a recreate or an abort is the appropriate reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network-level failure that exhausted the client's retry budget.
    Transport,
    /// The entity does not exist on the platform.
    NotFound,
    /// The platform rejected the request (precondition failed or conflict).
    Conflict,
    /// An asynchronous platform task completed with an error.
    AsyncTask,
    /// Client-side validation failed before any API call was issued.
    Validation,
    /// The reconciliation was cancelled or ran past its deadline.
    Cancelled,
    /// Unrecoverable without operator attention.
    Fatal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::AsyncTask => "async task",
            ErrorKind::Validation => "validation",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Fatal => "fatal",
        }
    }
}

/// Error returned by lifecycle handlers and the pieces they are built from.
#[derive(Debug, Error)]
#[error("{}: {message}", .kind.as_str())]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "reconciliation cancelled")
    }

    pub fn deadline_exceeded() -> Self {
        Self::new(ErrorKind::Cancelled, "reconciliation deadline exceeded")
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Prefix the message with the entity this error belongs to.
    pub fn in_context(mut self, entity: &str) -> Self {
        self.message = format!("{entity}: {}", self.message);
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::new(ErrorKind::Fatal, "response decoding failed").with_cause(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_kind_and_message() {
        let err = ProviderError::not_found("compute 42 is gone");
        assert_eq!(err.to_string(), "not found: compute 42 is gone");
        assert!(err.is_not_found());
    }

    #[test]
    fn context_prefixes_message() {
        let err = ProviderError::fatal("boom").in_context("vins.main");
        assert_eq!(err.to_string(), "fatal: vins.main: boom");
    }
}
