//! Transport-level retry with exponential backoff and jitter.
//!
//! [`BackoffConfig`] controls how a [`RuntimeTransport`](crate::transport::RuntimeTransport)
//! retries transient errors on `submit` (429 throttling, 5xx server-busy,
//! connection errors), per spec: "the transport MUST implement adaptive
//! retry on throttling/server-busy codes up to `max_retry_attempts`." This
//! is distinct from [`poll_backoff`](crate::poll_backoff), which governs how
//! often a single [`RolloutFuture`](crate::rollout_future::RolloutFuture)
//! re-issues its HEAD poll.

use crate::error::RolloutError;
use std::time::Duration;

/// Jitter strategy to prevent thundering herd when many futures retry at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterStrategy {
    /// No jitter. Delay is exactly the calculated value.
    None,
    /// Full jitter: random value in `[0, calculated_delay]` (AWS best practice).
    Full,
    /// Equal jitter: `calculated_delay/2 + random in [0, calculated_delay/2]`.
    Equal,
}

/// Configuration for transport-level retry with exponential backoff and jitter.
///
/// Handles transient errors (429 rate limit, 500/502/503/504 server errors,
/// connection failures) on [`RuntimeTransport::submit`](crate::transport::RuntimeTransport::submit)
/// by retrying with increasing delays, up to `max_retries`.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Maximum number of transport retries (i.e. `max_retry_attempts` - 1
    /// additional attempts beyond the first). Default: 5.
    pub max_retries: u32,

    /// Initial delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,

    /// Multiplier applied to the delay after each retry. Default: 2.0.
    pub multiplier: f64,

    /// Maximum delay between retries. Default: 30s.
    pub max_delay: Duration,

    /// Jitter strategy. Default: Full.
    pub jitter: JitterStrategy,

    /// HTTP status codes that trigger a retry. Default: `[429, 500, 502, 503, 504]`.
    pub retryable_statuses: Vec<u16>,

    /// Whether to respect `Retry-After` headers. Default: `true`.
    pub respect_retry_after: bool,
}

impl BackoffConfig {
    /// Construct from `max_retry_attempts` as exposed on [`ClientConfig`](crate::config::ClientConfig),
    /// using the spec's default delay/jitter settings.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// No retry at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculate the delay for attempt N (0-indexed), before jitter.
    fn base_delay(&self, attempt: u32) -> f64 {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        base.min(self.max_delay.as_secs_f64())
    }

    /// Calculate the jittered delay for attempt N (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let capped = self.base_delay(attempt);
        let jittered = match self.jitter {
            JitterStrategy::None => capped,
            JitterStrategy::Full => fastrand::f64() * capped,
            JitterStrategy::Equal => capped / 2.0 + fastrand::f64() * (capped / 2.0),
        };
        Duration::from_secs_f64(jittered)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: JitterStrategy::Full,
            retryable_statuses: vec![429, 500, 502, 503, 504],
            respect_retry_after: true,
        }
    }
}

/// Check whether a [`RolloutError`] is retryable under `config`.
pub fn is_retryable(error: &RolloutError, config: &BackoffConfig) -> bool {
    match error {
        RolloutError::HttpError { status, .. } => config.retryable_statuses.contains(status),
        RolloutError::Request(_) => true,
        _ => false,
    }
}

/// Retry-after hint carried by a retryable error, if any.
fn retry_after(error: &RolloutError) -> Option<Duration> {
    match error {
        RolloutError::HttpError { retry_after, .. } => *retry_after,
        _ => None,
    }
}

/// Run `op` with transport-level retry per `config`, invoking `on_retry`
/// before each retry attempt with `(attempt, delay, reason)`.
///
/// Returns the first success, or the last error once retries are exhausted.
pub async fn with_backoff<F, Fut, T>(
    config: &BackoffConfig,
    mut on_retry: Option<&mut (dyn FnMut(u32, Duration, &str) + Send)>,
    mut op: F,
) -> Result<T, RolloutError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, RolloutError>>,
{
    let mut last_error: Option<RolloutError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let prev = last_error.as_ref();
            let delay = match prev.and_then(retry_after) {
                Some(ra) if config.respect_retry_after => ra,
                _ => config.delay_for_attempt(attempt - 1),
            };
            let reason = prev.map(|e| e.to_string()).unwrap_or_default();
            if let Some(ref mut cb) = on_retry {
                cb(attempt, delay, &reason);
            }
            tokio::time::sleep(delay).await;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt < config.max_retries && is_retryable(&e, config) {
                    last_error = Some(e);
                    continue;
                }
                return Err(e);
            }
        }
    }

    Err(last_error.unwrap_or(RolloutError::Other(
        "backoff loop exited unexpectedly".into(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_retryable_429() {
        let config = BackoffConfig::default();
        let err = RolloutError::HttpError {
            status: 429,
            body: "rate limited".into(),
            retry_after: None,
        };
        assert!(is_retryable(&err, &config));
    }

    #[test]
    fn is_retryable_400_not_retried() {
        let config = BackoffConfig::default();
        let err = RolloutError::HttpError {
            status: 400,
            body: "bad request".into(),
            retry_after: None,
        };
        assert!(!is_retryable(&err, &config));
    }

    #[test]
    fn is_retryable_cancelled_not_retried() {
        let config = BackoffConfig::default();
        assert!(!is_retryable(&RolloutError::Cancelled, &config));
    }

    #[test]
    fn delay_exponential_without_jitter() {
        let config = BackoffConfig {
            jitter: JitterStrategy::None,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            ..BackoffConfig::default()
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
    }

    #[test]
    fn delay_capped_at_max() {
        let config = BackoffConfig {
            jitter: JitterStrategy::None,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
            ..BackoffConfig::default()
        };
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn with_backoff_retries_until_success() {
        let config = BackoffConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..BackoffConfig::default()
        };
        let mut attempts = 0;
        let result = with_backoff(&config, None, || {
            attempts += 1;
            let this_attempt = attempts;
            async move {
                if this_attempt < 3 {
                    Err(RolloutError::HttpError {
                        status: 503,
                        body: "busy".into(),
                        retry_after: None,
                    })
                } else {
                    Ok(this_attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn with_backoff_gives_up_on_non_retryable() {
        let config = BackoffConfig::default();
        let mut attempts = 0;
        let result: Result<(), RolloutError> = with_backoff(&config, None, || {
            attempts += 1;
            async { Err(RolloutError::Configuration("bad".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }
}
