//! The remote agent runtime, abstracted to the two operations this crate
//! needs (spec §6). Concrete implementations live in [`mock`](crate::mock)
//! (for tests) and [`http`](crate::http) (a generic REST reference client);
//! production users typically wire in `aws-sdk-bedrockagentcore` behind
//! this same trait.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Parsed reply to a `submit` call.
///
/// `s3_bucket`/`result_key` are `None` exactly when the submission carried
/// no `_rollout` config (fire-and-forget mode) — that path never produces a
/// [`RolloutFuture`](crate::rollout_future::RolloutFuture) and sits outside
/// the batch engine entirely (spec §8 scenario 6).
#[derive(Debug, Clone)]
pub struct SubmitResponse {
    pub status: String,
    pub s3_bucket: Option<String>,
    pub result_key: Option<String>,
}

/// Abstraction over the remote agent runtime.
///
/// Implementors translate `submit`/`stop_session` into the provider's wire
/// protocol. The trait is object-safe so it can be used as
/// `Arc<dyn RuntimeTransport>` and shared between a [`RolloutClient`](crate::client::RolloutClient)
/// and every [`RolloutFuture`](crate::rollout_future::RolloutFuture) it produces.
#[async_trait]
pub trait RuntimeTransport: Send + Sync {
    /// Submit `payload` under `session_id` to `runtime_arn`.
    ///
    /// Implementations MUST apply their own adaptive retry on throttling/
    /// server-busy codes (see [`backoff::with_backoff`](crate::backoff::with_backoff))
    /// up to their configured `max_retry_attempts` — the client calls this
    /// exactly once and lets any error propagate unretried. Return
    /// [`RolloutError::HttpError`](crate::error::RolloutError::HttpError)
    /// with the real status code so a retry policy built on `is_retryable`
    /// can classify it.
    async fn submit(
        &self,
        runtime_arn: &str,
        session_id: &str,
        payload: &Value,
    ) -> Result<SubmitResponse>;

    /// Best-effort stop of a running session. Failure is swallowed by the
    /// caller ([`RolloutFuture::cancel`](crate::rollout_future::RolloutFuture::cancel));
    /// implementations should still return `Err` on failure so the caller
    /// can decide, rather than silently succeeding.
    async fn stop_session(&self, runtime_arn: &str, session_id: &str) -> Result<()>;
}
