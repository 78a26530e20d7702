//! The batch engine: schedules submissions under concurrency/throughput
//! caps and streams results as they complete (spec §4.4).

use crate::client::RolloutClient;
use crate::events::{self, Event};
use crate::rollout_future::RolloutFuture;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// One yielded unit from [`BatchStream`]. `index` is the 0-based position
/// of the originating payload in the input list; items are yielded in
/// **completion order**, not input order (spec §3, §8).
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub index: usize,
    pub elapsed: Duration,
}

impl BatchItem {
    fn success(index: usize, result: Value, elapsed: Duration) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            index,
            elapsed,
        }
    }

    fn failure(index: usize, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            index,
            elapsed,
        }
    }
}

/// Inputs to [`RolloutClient::run_batch`]. Defaults match spec §6.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Max agent-runtime sessions running concurrently.
    pub max_concurrent_sessions: usize,
    /// Starting per-future poll interval.
    pub initial_interval: Duration,
    /// Cap on per-future poll interval.
    pub max_interval: Duration,
    /// Multiplier applied to a future's poll interval after each 404.
    pub backoff_factor: f64,
    /// Per-job deadline. `None` means "no timeout" (spec §9 open question,
    /// resolved this way).
    pub timeout: Option<Duration>,
}

impl BatchConfig {
    pub fn new(max_concurrent_sessions: usize) -> Self {
        Self {
            max_concurrent_sessions,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 1,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(30),
            backoff_factor: 1.5,
            timeout: None,
        }
    }
}

struct ActiveEntry {
    index: usize,
    future: RolloutFuture,
    submit_time: Instant,
}

/// Drives a list of payloads through submission, adaptive polling, timeout,
/// and cancellation, yielding [`BatchItem`]s in completion order.
///
/// Single-threaded cooperative: `next()` multiplexes every outstanding
/// future's wall-clock deadline on one `.await`er, with no locks or shared
/// mutable state across tasks (spec §5).
pub struct BatchStream<'a> {
    client: &'a mut RolloutClient,
    pending: VecDeque<(usize, Value)>,
    active: HashMap<String, ActiveEntry>,
    config: BatchConfig,
    /// A submission failure discovered mid-`fill()`, surfaced on the next
    /// call to `poll_active()` since `fill()` itself yields nothing.
    pending_failure: Option<BatchItem>,
}

impl<'a> BatchStream<'a> {
    pub(crate) fn new(client: &'a mut RolloutClient, payloads: Vec<Value>, config: BatchConfig) -> Self {
        let pending = payloads.into_iter().enumerate().collect();
        Self {
            client,
            pending,
            active: HashMap::new(),
            config,
            pending_failure: None,
        }
    }

    /// Pull the next completed item, or `None` once both the pending queue
    /// and the active set are empty.
    pub async fn next(&mut self) -> Option<BatchItem> {
        loop {
            self.fill().await;

            if let Some(item) = self.poll_active().await {
                return Some(item);
            }

            if let Some(item) = self.reap_timeouts().await {
                return Some(item);
            }

            if self.pending.is_empty() && self.active.is_empty() {
                return None;
            }

            self.sleep_until_next_event().await;
        }
    }

    /// Convert into a [`futures::Stream`] for use with `StreamExt`
    /// combinators (`.collect()`, `.for_each()`, etc).
    pub fn into_stream(self) -> impl futures::Stream<Item = BatchItem> + 'a {
        futures::stream::unfold(self, |mut s| async move { s.next().await.map(|item| (item, s)) })
    }

    async fn fill(&mut self) {
        while !self.pending.is_empty() && self.active.len() < self.config.max_concurrent_sessions {
            let (index, payload) = self.pending.pop_front().unwrap();
            let session_id = uuid::Uuid::new_v4().to_string();
            let input_id = uuid::Uuid::new_v4().to_string();

            match self.client.invoke(payload, Some(session_id), Some(input_id)).await {
                Ok(mut future) => {
                    future.set_backoff(
                        self.config.initial_interval,
                        self.config.max_interval,
                        self.config.backoff_factor,
                    );
                    let key = future.result_key().to_string();
                    self.active.insert(
                        key,
                        ActiveEntry {
                            index,
                            future,
                            submit_time: Instant::now(),
                        },
                    );
                }
                Err(e) => {
                    // Isolated to this item; the rest of the batch keeps going.
                    self.pending_failure = Some(BatchItem::failure(index, e.to_string(), Duration::ZERO));
                    return;
                }
            }
        }
    }

    async fn poll_active(&mut self) -> Option<BatchItem> {
        if let Some(item) = self.pending_failure.take() {
            return Some(item);
        }

        let mut completed: Option<(String, BatchItem)> = None;

        for (key, entry) in self.active.iter_mut() {
            if !entry.future.ready_to_poll() {
                continue;
            }
            let elapsed = entry.submit_time.elapsed();
            match entry.future.done().await {
                Ok(true) => {
                    let item = match entry.future.result(None).await {
                        Ok(value) => BatchItem::success(entry.index, value, elapsed),
                        Err(e) => BatchItem::failure(entry.index, e.to_string(), elapsed),
                    };
                    completed = Some((key.clone(), item));
                    break;
                }
                Ok(false) => continue,
                Err(e) => {
                    completed = Some((key.clone(), BatchItem::failure(entry.index, e.to_string(), elapsed)));
                    break;
                }
            }
        }

        let (key, item) = completed?;
        if let Some(entry) = self.active.remove(&key) {
            events::emit(
                self.client.events(),
                Event::Completed {
                    index: Some(entry.index),
                    result_key: key,
                    elapsed: item.elapsed,
                },
            );
        }
        Some(item)
    }

    async fn reap_timeouts(&mut self) -> Option<BatchItem> {
        let timeout = self.config.timeout?;
        let timed_out_key = self
            .active
            .iter()
            .find(|(_, entry)| entry.submit_time.elapsed() > timeout)
            .map(|(key, _)| key.clone())?;

        let mut entry = self.active.remove(&timed_out_key)?;
        let elapsed = entry.submit_time.elapsed();
        entry.future.cancel().await;

        events::emit(
            self.client.events(),
            Event::TimedOut {
                index: Some(entry.index),
                result_key: timed_out_key,
                elapsed,
            },
        );

        Some(BatchItem::failure(
            entry.index,
            format!("Timeout after {timeout:?}"),
            elapsed,
        ))
    }

    async fn sleep_until_next_event(&self) {
        let mut wait = self
            .active
            .values()
            .map(|e| e.future.time_until_next_poll())
            .min()
            .unwrap_or(Duration::MAX);

        if let Some(timeout) = self.config.timeout {
            for entry in self.active.values() {
                let remaining = timeout.saturating_sub(entry.submit_time.elapsed());
                wait = wait.min(remaining);
            }
        }

        if wait > Duration::ZERO && wait < Duration::MAX {
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::mock::{MockObjectStore, MockRuntimeTransport, SubmitOutcome};
    use crate::transport::SubmitResponse;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn client(transport: Arc<MockRuntimeTransport>, store: Arc<MockObjectStore>) -> RolloutClient {
        let config = ClientConfig::new(
            "arn:aws:bedrock-agentcore:us-west-2:123:agent/x",
            "bucket",
            "exp1",
        );
        RolloutClient::new(transport, store, config).unwrap()
    }

    #[tokio::test]
    async fn empty_payload_list_yields_nothing() {
        let transport = Arc::new(MockRuntimeTransport::new());
        let store = Arc::new(MockObjectStore::new());
        let mut c = client(transport, store);
        let mut stream = c.run_batch(vec![], BatchConfig::new(10));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn happy_path_three_jobs_all_succeed() {
        let transport = Arc::new(MockRuntimeTransport::new());
        let store = Arc::new(MockObjectStore::auto_complete());
        let mut c = client(transport.clone(), store);

        let payloads = vec![json!({"p": "q1"}), json!({"p": "q2"}), json!({"p": "q3"})];
        let mut stream = c.run_batch(payloads, BatchConfig::new(10));

        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item);
        }

        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.success));
        let indices: HashSet<usize> = items.iter().map(|i| i.index).collect();
        assert_eq!(indices, HashSet::from([0, 1, 2]));
        assert_eq!(transport.submit_calls(), 3);
    }

    #[tokio::test]
    async fn submission_failure_is_isolated_to_its_index() {
        let transport = Arc::new(MockRuntimeTransport::with_outcomes(vec![
            SubmitOutcome::Ok(SubmitResponse {
                status: "processing".into(),
                s3_bucket: Some("bucket".into()),
                result_key: Some("exp1/c_3.json".into()),
            }),
            SubmitOutcome::Err("ACR invocation failed".into()),
            SubmitOutcome::Ok(SubmitResponse {
                status: "processing".into(),
                s3_bucket: Some("bucket".into()),
                result_key: Some("exp1/a_1.json".into()),
            }),
        ]));
        let store = Arc::new(MockObjectStore::new());
        store.put("bucket", "exp1/a_1.json", b"{\"result\":1}".to_vec());
        store.put("bucket", "exp1/c_3.json", b"{\"result\":3}".to_vec());

        let mut c = client(transport, store);
        let payloads = vec![json!({"p": "q1"}), json!({"p": "q2"}), json!({"p": "q3"})];
        let mut stream = c.run_batch(payloads, BatchConfig::new(10));

        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item);
        }

        assert_eq!(items.len(), 3);
        let failed: Vec<_> = items.iter().filter(|i| !i.success).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].index, 1);
        assert!(failed[0].error.as_ref().unwrap().contains("ACR invocation failed"));
        assert_eq!(failed[0].elapsed, Duration::ZERO);

        let succeeded: HashSet<usize> = items.iter().filter(|i| i.success).map(|i| i.index).collect();
        assert_eq!(succeeded, HashSet::from([0, 2]));

        // Pins which queued outcome landed on which index, catching any
        // regression to FIFO/LIFO outcome consumption order.
        let by_index = |i: usize| items.iter().find(|item| item.index == i).unwrap();
        assert_eq!(by_index(0).result.as_ref().unwrap()["result"], 3);
        assert_eq!(by_index(2).result.as_ref().unwrap()["result"], 1);
    }

    #[tokio::test]
    async fn timeout_cancels_and_yields_failure() {
        let transport = Arc::new(MockRuntimeTransport::new());
        let store = Arc::new(MockObjectStore::new());
        let mut c = client(transport.clone(), store);

        let mut config = BatchConfig::new(1).with_timeout(Duration::from_millis(20));
        config.initial_interval = Duration::from_millis(5);
        config.max_interval = Duration::from_millis(5);

        let mut stream = c.run_batch(vec![json!({"p": "q"})], config);
        let item = stream.next().await.unwrap();

        assert!(!item.success);
        assert!(item.error.as_ref().unwrap().starts_with("Timeout"));
        assert_eq!(item.index, 0);
        assert!(item.elapsed >= Duration::from_millis(20));
        assert_eq!(transport.stop_calls(), 1);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn max_concurrent_sessions_one_still_completes_every_job() {
        let transport = Arc::new(MockRuntimeTransport::new());
        let store = Arc::new(MockObjectStore::auto_complete());
        let mut c = client(transport.clone(), store);

        let payloads = vec![json!({"p": "q1"}), json!({"p": "q2"})];
        let mut stream = c.run_batch(payloads, BatchConfig::new(1));

        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item);
        }

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.success));
        assert_eq!(transport.submit_calls(), 2);
    }
}
