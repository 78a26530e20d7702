//! Event system for rollout lifecycle observability.
//!
//! Provides an optional, non-intrusive way to observe the batch engine and
//! individual futures. The client emits events on submission, each poll
//! attempt, completion, timeout, and cancellation. Users can implement
//! [`EventHandler`] for logging, progress bars, or metrics export.

use std::sync::Arc;
use std::time::Duration;

/// Events emitted during rollout submission and polling.
#[derive(Debug, Clone)]
pub enum Event {
    /// A submission is about to be sent to the runtime, after the rate
    /// limiter has released it.
    SubmissionStarted {
        /// 0-based index in the batch's input list, if this came from a batch.
        index: Option<usize>,
        /// Session id assigned to this submission.
        session_id: String,
    },
    /// The runtime accepted the submission and returned a result key.
    SubmissionSucceeded {
        index: Option<usize>,
        session_id: String,
        result_key: String,
    },
    /// The runtime rejected or failed to accept the submission.
    SubmissionFailed {
        index: Option<usize>,
        session_id: String,
        reason: String,
    },
    /// A HEAD request against the object store came back 404; the future's
    /// poll interval grew as a result.
    PollAttempt {
        result_key: String,
        next_poll_interval: Duration,
    },
    /// A future's result object was found and fetched successfully.
    Completed {
        index: Option<usize>,
        result_key: String,
        elapsed: Duration,
    },
    /// A future's per-job deadline elapsed; cancellation was attempted.
    TimedOut {
        index: Option<usize>,
        result_key: String,
        elapsed: Duration,
    },
    /// A future was cancelled (by the caller, or by the batch engine after
    /// a timeout).
    Cancelled {
        result_key: String,
        stop_session_ok: bool,
    },
    /// A transport-level retry due to an HTTP error on `submit`.
    TransportRetry {
        attempt: u32,
        delay: Duration,
        reason: String,
    },
}

/// Handler for rollout lifecycle events.
///
/// Implement this trait to receive submission, polling, and completion
/// signals. This is entirely optional — the client and batch engine work
/// without an event handler.
///
/// # Example
///
/// ```
/// use agentcore_rollout_client::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         match event {
///             Event::Completed { result_key, elapsed, .. } => {
///                 println!("[done] {} in {:?}", result_key, elapsed)
///             }
///             Event::TimedOut { result_key, .. } => println!("[timeout] {}", result_key),
///             _ => {}
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called when the client or batch engine emits an event.
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
///
/// ```
/// use agentcore_rollout_client::events::{Event, FnEventHandler};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: Event| {
///     if let Event::Completed { result_key, .. } = event {
///         println!("done: {}", result_key);
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}
