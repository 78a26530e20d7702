//! The rollout client: submits payloads to the remote runtime and returns
//! futures for their eventual results.
//!
//! Well-formed results (once a [`RolloutFuture`](crate::rollout_future::RolloutFuture)
//! resolves) are JSON objects written by the server-side entrypoint
//! decorator (out of scope for this crate — see `SPEC_FULL.md` §9). They
//! carry at least `status_code` and `stop_reason`, and on success also
//! `rollout_data` (a non-empty array) and `rewards` (length 1 or matching
//! `rollout_data`). This crate treats presence of the object as the only
//! completion signal and does not validate that shape.

use crate::batch::{BatchConfig, BatchStream};
use crate::config::{ClientConfig, RolloutConfig};
use crate::error::{Result, RolloutError};
use crate::events::{self, Event, EventHandler};
use crate::object_store::ObjectStore;
use crate::poll_backoff::PollBackoff;
use crate::rate_limiter::RateLimiter;
use crate::rollout_future::RolloutFuture;
use crate::transport::RuntimeTransport;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Default per-future backoff tunables (spec §6).
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.5;

/// Client for invoking agent rollouts and collecting results.
///
/// NOT thread-safe: owns a [`RateLimiter`] with mutable, monotonic state.
/// Use one `RolloutClient` per thread/task; it is still `Send` so it can be
/// moved between tasks, just never shared concurrently.
pub struct RolloutClient {
    transport: Arc<dyn RuntimeTransport>,
    store: Arc<dyn ObjectStore>,
    config: ClientConfig,
    region: String,
    rate_limiter: RateLimiter,
    events: Option<Arc<dyn EventHandler>>,
}

impl std::fmt::Debug for RolloutClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RolloutClient")
            .field("config", &self.config)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl RolloutClient {
    /// Construct a client. Fails immediately if `config.agent_runtime_arn`
    /// cannot be parsed for a region (spec §4.2).
    pub fn new(
        transport: Arc<dyn RuntimeTransport>,
        store: Arc<dyn ObjectStore>,
        config: ClientConfig,
    ) -> Result<Self> {
        let region = crate::config::region_from_arn(&config.agent_runtime_arn)?;
        let rate_limiter = RateLimiter::new(config.tps_limit);
        Ok(Self {
            transport,
            store,
            config,
            region,
            rate_limiter,
            events: None,
        })
    }

    /// Attach an event handler for submission/polling observability.
    pub fn with_events(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.events = Some(handler);
        self
    }

    /// The AWS region inferred from the configured ARN.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Single invocation: rate-limits, submits, and returns a future for
    /// the result. `session_id`/`input_id` default to fresh UUIDs when
    /// omitted.
    pub async fn invoke(
        &mut self,
        payload: Value,
        session_id: Option<String>,
        input_id: Option<String>,
    ) -> Result<RolloutFuture> {
        let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let input_id = input_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        self.rate_limiter.acquire().await;

        let rollout_config = RolloutConfig {
            exp_id: self.config.exp_id.clone(),
            session_id: session_id.clone(),
            input_id,
            s3_bucket: self.config.s3_bucket.clone(),
            base_url: self.config.base_url.clone(),
            model_id: self.config.model_id.clone(),
            extra: self.config.extra_config.clone(),
        };

        let mut full_payload = payload;
        if !full_payload.is_object() {
            return Err(RolloutError::Configuration(
                "payload must be a JSON object".into(),
            ));
        }
        full_payload["_rollout"] = rollout_config.to_value();

        events::emit(
            &self.events,
            Event::SubmissionStarted {
                index: None,
                session_id: session_id.clone(),
            },
        );

        let runtime_arn = self.config.agent_runtime_arn.clone();

        // Exactly one call: the transport owns adaptive retry on
        // throttling/server-busy codes, not the client.
        let response = self.transport.submit(&runtime_arn, &session_id, &full_payload).await;

        let response = match response {
            Ok(resp) => resp,
            Err(e) => {
                events::emit(
                    &self.events,
                    Event::SubmissionFailed {
                        index: None,
                        session_id: session_id.clone(),
                        reason: e.to_string(),
                    },
                );
                return Err(e);
            }
        };

        let bucket = response.s3_bucket.clone().ok_or_else(|| {
            RolloutError::Submission("runtime did not return an s3_bucket for a rollout submission".into())
        })?;
        let result_key = response.result_key.clone().ok_or_else(|| {
            RolloutError::Submission("runtime did not return a result_key for a rollout submission".into())
        })?;

        events::emit(
            &self.events,
            Event::SubmissionSucceeded {
                index: None,
                session_id: session_id.clone(),
                result_key: result_key.clone(),
            },
        );

        let backoff = PollBackoff::new(DEFAULT_INITIAL_INTERVAL, DEFAULT_MAX_INTERVAL, DEFAULT_BACKOFF_FACTOR);

        Ok(RolloutFuture::new(
            self.store.clone(),
            bucket,
            result_key,
            Some(self.transport.clone()),
            Some(self.config.agent_runtime_arn.clone()),
            Some(session_id),
            backoff,
            self.events.clone(),
        ))
    }

    /// Run a batch of payloads under concurrency/throughput caps, yielding
    /// [`BatchItem`](crate::batch::BatchItem)s as they complete (spec §4.4).
    pub fn run_batch(&mut self, payloads: Vec<Value>, config: BatchConfig) -> BatchStream<'_> {
        BatchStream::new(self, payloads, config)
    }

    pub(crate) fn transport(&self) -> &Arc<dyn RuntimeTransport> {
        &self.transport
    }

    pub(crate) fn events(&self) -> &Option<Arc<dyn EventHandler>> {
        &self.events
    }

    pub(crate) fn runtime_arn(&self) -> &str {
        &self.config.agent_runtime_arn
    }
}
