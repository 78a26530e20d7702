use std::time::Duration;
use thiserror::Error;

/// Errors produced by the rollout client and batch engine.
#[derive(Error, Debug)]
pub enum RolloutError {
    /// Bad ARN, missing required config field, or any other misconfiguration
    /// detected before a job is ever submitted. Never wrapped in a
    /// [`BatchItem`](crate::batch::BatchItem) — always raised directly to the
    /// caller of [`RolloutClient::new`](crate::client::RolloutClient::new) or
    /// [`invoke`](crate::client::RolloutClient::invoke).
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The runtime rejected or failed to accept a submission.
    #[error("submission failed: {0}")]
    Submission(String),

    /// A HEAD against the object store failed for a reason other than
    /// "not found".
    #[error("polling failed: {0}")]
    Polling(String),

    /// A GET against the object store failed, or its body was not valid
    /// JSON.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// HTTP error with status code, body, and optional `Retry-After` hint.
    /// Returned by [`RuntimeTransport`](crate::transport::RuntimeTransport)
    /// implementations; classified as retryable or not by
    /// [`backoff::is_retryable`](crate::backoff::is_retryable).
    #[error("HTTP {status}: {body}")]
    HttpError {
        /// HTTP status code (e.g. 429, 500, 503).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// The per-job deadline elapsed before the result appeared. Cancellation
    /// of the session is attempted best-effort before this is returned.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// The future was cancelled, by the caller or by the batch engine's
    /// timeout phase; subsequent `result()` calls fail with this variant.
    #[error("future was cancelled")]
    Cancelled,

    /// Low-level HTTP transport failure (connection refused, timeout, etc.)
    /// surfaced by `reqwest`-backed implementations of the transport/store
    /// traits.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON encoding/decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for RolloutError {
    fn from(err: anyhow::Error) -> Self {
        RolloutError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RolloutError>;
