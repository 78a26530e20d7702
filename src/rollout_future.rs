//! The per-job future: tracks a pending rollout result and polls for it
//! with adaptive backoff.

use crate::error::{Result, RolloutError};
use crate::events::{self, Event, EventHandler};
use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::poll_backoff::PollBackoff;
use crate::transport::RuntimeTransport;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A handle used only for best-effort remote cancellation. Present iff the
/// submission carried a session that can be stopped.
#[derive(Clone)]
struct CancelHandle {
    transport: Arc<dyn RuntimeTransport>,
    runtime_arn: String,
    session_id: String,
}

/// One outstanding rollout job, polled via HEAD on the object store.
///
/// `done_flag`/`cancelled_flag` are monotonic: once true, they stay true.
/// Once `cancelled_flag` is true, no HEAD or GET is ever issued again (spec
/// §3 invariants).
pub struct RolloutFuture {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    result_key: String,
    cancel_handle: Option<CancelHandle>,
    events: Option<Arc<dyn EventHandler>>,

    backoff: PollBackoff,
    done: bool,
    cancelled: bool,
    result: Option<Value>,
}

impl RolloutFuture {
    /// Construct a future bound to `(bucket, result_key)`. `cancel_handle`
    /// is `None` when the future has no way to cancel its remote session
    /// (e.g. constructed directly against a store without a matching
    /// transport).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        store: Arc<dyn ObjectStore>,
        bucket: String,
        result_key: String,
        transport: Option<Arc<dyn RuntimeTransport>>,
        runtime_arn: Option<String>,
        session_id: Option<String>,
        backoff: PollBackoff,
        events: Option<Arc<dyn EventHandler>>,
    ) -> Self {
        let cancel_handle = match (transport, runtime_arn, session_id) {
            (Some(transport), Some(runtime_arn), Some(session_id)) => Some(CancelHandle {
                transport,
                runtime_arn,
                session_id,
            }),
            _ => None,
        };
        Self {
            store,
            bucket,
            result_key,
            cancel_handle,
            events,
            backoff,
            done: false,
            cancelled: false,
            result: None,
        }
    }

    /// The object-store key this future is waiting on. Used by the batch
    /// engine as the key of its `active` map.
    pub fn result_key(&self) -> &str {
        &self.result_key
    }

    /// Override this future's backoff parameters in place (spec §4.4 fill
    /// phase: the batch engine applies its own backoff settings to every
    /// future it creates, superseding whatever [`RolloutClient::invoke`](crate::client::RolloutClient::invoke)
    /// used by default).
    pub fn set_backoff(&mut self, initial: Duration, max: Duration, factor: f64) {
        self.backoff.reconfigure(initial, max, factor);
    }

    /// Non-blocking completion check. Issues a HEAD unless already done or
    /// cancelled.
    pub async fn done(&mut self) -> Result<bool> {
        if self.done {
            return Ok(true);
        }
        match self.store.head(&self.bucket, &self.result_key).await {
            Ok(()) => {
                self.done = true;
                Ok(true)
            }
            Err(ObjectStoreError::NotFound) => {
                let now = Instant::now();
                self.backoff.record_miss(now);
                events::emit(
                    &self.events,
                    Event::PollAttempt {
                        result_key: self.result_key.clone(),
                        next_poll_interval: self.backoff.interval(),
                    },
                );
                Ok(false)
            }
            Err(ObjectStoreError::Other(msg)) => Err(RolloutError::Polling(msg)),
        }
    }

    /// Seconds until this future should be polled again. `Duration::MAX`
    /// once done, standing in for the spec's `+∞`.
    pub fn time_until_next_poll(&self) -> Duration {
        if self.done {
            return Duration::MAX;
        }
        self.backoff.time_until_next_poll(Instant::now())
    }

    /// True iff enough time has passed since the last poll.
    pub fn ready_to_poll(&self) -> bool {
        if self.done {
            return true;
        }
        self.backoff.ready_to_poll(Instant::now())
    }

    /// Block until the result is ready, polling with the current backoff
    /// interval between attempts. Fails with [`RolloutError::Cancelled`] if
    /// this future was cancelled, or [`RolloutError::Timeout`] if `timeout`
    /// elapses first.
    pub async fn result(&mut self, timeout: Option<Duration>) -> Result<Value> {
        if let Some(ref cached) = self.result {
            return Ok(cached.clone());
        }
        if self.cancelled {
            return Err(RolloutError::Cancelled);
        }

        let start = Instant::now();
        loop {
            if self.done().await? {
                let bytes = self
                    .store
                    .get(&self.bucket, &self.result_key)
                    .await
                    .map_err(|e| RolloutError::Fetch(e.to_string()))?;
                let value: Value = serde_json::from_slice(&bytes)?;
                self.result = Some(value.clone());
                return Ok(value);
            }

            if let Some(timeout) = timeout {
                if start.elapsed() > timeout {
                    return Err(RolloutError::Timeout(timeout));
                }
            }

            tokio::time::sleep(self.backoff.interval()).await;
        }
    }

    /// Idempotent cancellation. Returns `true` iff this call performed the
    /// cancellation (i.e. the future was not already cancelled or done) and
    /// the remote `stop_session` call succeeded; `false` if it was already
    /// cancelled, already completed successfully, or the remote call
    /// failed/was unavailable.
    ///
    /// A future that already completed via the normal HEAD/GET path is left
    /// alone — there is no running session left to stop.
    ///
    /// After this returns, `done()` is always `true` without issuing I/O,
    /// and `result()` always fails with [`RolloutError::Cancelled`] unless
    /// a result was already cached.
    pub async fn cancel(&mut self) -> bool {
        if self.cancelled || self.done {
            return false;
        }
        self.cancelled = true;
        self.done = true;

        let stopped = match &self.cancel_handle {
            Some(handle) => handle
                .transport
                .stop_session(&handle.runtime_arn, &handle.session_id)
                .await
                .is_ok(),
            None => false,
        };

        events::emit(
            &self.events,
            Event::Cancelled {
                result_key: self.result_key.clone(),
                stop_session_ok: stopped,
            },
        );

        stopped
    }
}
