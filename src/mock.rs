//! In-memory [`RuntimeTransport`]/[`ObjectStore`] implementations for
//! testing the client and batch engine without any network I/O.
//!
//! Mirrors the canned-response pattern of the teacher crate's
//! `backend::MockBackend`, and the `MagicMock`-based `s3_client`/
//! `agentcore_client` stand-ins in `examples/original_source/tests/test_client.py`.

use crate::error::{Result, RolloutError};
use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::transport::{RuntimeTransport, SubmitResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A queued outcome for [`MockRuntimeTransport::submit`].
pub enum SubmitOutcome {
    Ok(SubmitResponse),
    Err(String),
}

/// A transport that returns pre-configured submission outcomes in order,
/// and records every call for assertions.
pub struct MockRuntimeTransport {
    outcomes: Mutex<VecDeque<SubmitOutcome>>,
    default_bucket: String,
    submit_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    last_stop: Mutex<Option<(String, String)>>,
    fail_stop: bool,
}

impl MockRuntimeTransport {
    /// A transport whose `submit` always succeeds, deriving `result_key`
    /// from the `_rollout` config embedded in the payload.
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            default_bucket: "bucket".into(),
            submit_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            last_stop: Mutex::new(None),
            fail_stop: false,
        }
    }

    /// Queue outcomes to be returned in declared order (FIFO: the first
    /// `submit` call gets `outcomes[0]`); once exhausted, falls back to
    /// deriving a successful response from the payload.
    pub fn with_outcomes(outcomes: Vec<SubmitOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::new()
        }
    }

    /// Make every `stop_session` call fail.
    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn last_stop(&self) -> Option<(String, String)> {
        self.last_stop.lock().unwrap().clone()
    }
}

impl Default for MockRuntimeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuntimeTransport for MockRuntimeTransport {
    async fn submit(
        &self,
        _runtime_arn: &str,
        session_id: &str,
        payload: &Value,
    ) -> Result<SubmitResponse> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        let queued = self.outcomes.lock().unwrap().pop_front();
        if let Some(outcome) = queued {
            return match outcome {
                SubmitOutcome::Ok(resp) => Ok(resp),
                SubmitOutcome::Err(msg) => Err(RolloutError::Submission(msg)),
            };
        }

        let rollout = payload.get("_rollout");
        match rollout {
            Some(cfg) => {
                let exp_id = cfg.get("exp_id").and_then(|v| v.as_str()).unwrap_or("exp");
                let input_id = cfg.get("input_id").and_then(|v| v.as_str()).unwrap_or("in");
                let bucket = cfg
                    .get("s3_bucket")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&self.default_bucket);
                Ok(SubmitResponse {
                    status: "processing".into(),
                    s3_bucket: Some(bucket.to_string()),
                    result_key: Some(format!("{exp_id}/{input_id}_{session_id}.json")),
                })
            }
            None => Ok(SubmitResponse {
                status: "processing".into(),
                s3_bucket: None,
                result_key: None,
            }),
        }
    }

    async fn stop_session(&self, runtime_arn: &str, session_id: &str) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_stop.lock().unwrap() = Some((runtime_arn.to_string(), session_id.to_string()));
        if self.fail_stop {
            Err(RolloutError::Submission("stop_session failed".into()))
        } else {
            Ok(())
        }
    }
}

/// An in-memory object store. `put` pre-seeds an object so `head`/`get`
/// succeed for it; anything not seeded is `NotFound`, unless `auto_complete`
/// is set, in which case every key succeeds immediately with a default body
/// (used to test batch-level completion without knowing runtime-generated
/// keys in advance).
pub struct MockObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    head_calls: AtomicUsize,
    get_calls: AtomicUsize,
    auto_complete: bool,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            head_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            auto_complete: false,
        }
    }

    /// Every key succeeds on its first HEAD/GET, with a default JSON body
    /// unless that key was also `put`.
    pub fn auto_complete() -> Self {
        Self {
            auto_complete: true,
            ..Self::new()
        }
    }

    /// Seed an object so future HEAD/GET calls for `(bucket, key)` succeed.
    pub fn put(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body);
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn head(&self, bucket: &str, key: &str) -> std::result::Result<(), ObjectStoreError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        let lookup = (bucket.to_string(), key.to_string());
        if self.objects.lock().unwrap().contains_key(&lookup) || self.auto_complete {
            Ok(())
        } else {
            Err(ObjectStoreError::NotFound)
        }
    }

    async fn get(&self, bucket: &str, key: &str) -> std::result::Result<Vec<u8>, ObjectStoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let lookup = (bucket.to_string(), key.to_string());
        if let Some(body) = self.objects.lock().unwrap().get(&lookup).cloned() {
            return Ok(body);
        }
        if self.auto_complete {
            return Ok(br#"{"status_code": 200, "stop_reason": "end_turn"}"#.to_vec());
        }
        Err(ObjectStoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn submit_derives_result_key_from_rollout_config() {
        let transport = MockRuntimeTransport::new();
        let payload = json!({
            "_rollout": {
                "exp_id": "exp1",
                "session_id": "sess1",
                "input_id": "in1",
                "s3_bucket": "my-bucket",
            }
        });
        let resp = transport.submit("arn", "sess1", &payload).await.unwrap();
        assert_eq!(resp.result_key.unwrap(), "exp1/in1_sess1.json");
        assert_eq!(resp.s3_bucket.unwrap(), "my-bucket");
    }

    #[tokio::test]
    async fn with_outcomes_are_consumed_in_declared_order() {
        let transport = MockRuntimeTransport::with_outcomes(vec![
            SubmitOutcome::Err("first call fails".into()),
            SubmitOutcome::Ok(SubmitResponse {
                status: "processing".into(),
                s3_bucket: Some("bucket".into()),
                result_key: Some("k1".into()),
            }),
            SubmitOutcome::Ok(SubmitResponse {
                status: "processing".into(),
                s3_bucket: Some("bucket".into()),
                result_key: Some("k2".into()),
            }),
        ]);

        match transport.submit("arn", "s0", &json!({})).await.unwrap_err() {
            RolloutError::Submission(msg) => assert_eq!(msg, "first call fails"),
            other => panic!("expected Submission error, got {other:?}"),
        }

        let first = transport.submit("arn", "s1", &json!({})).await.unwrap();
        assert_eq!(first.result_key.unwrap(), "k1");

        let second = transport.submit("arn", "s2", &json!({})).await.unwrap();
        assert_eq!(second.result_key.unwrap(), "k2");
    }

    #[tokio::test]
    async fn submit_without_rollout_config_returns_no_key() {
        let transport = MockRuntimeTransport::new();
        let resp = transport.submit("arn", "sess1", &json!({"p": "q"})).await.unwrap();
        assert!(resp.result_key.is_none());
        assert!(resp.s3_bucket.is_none());
    }

    #[tokio::test]
    async fn object_store_not_found_until_seeded() {
        let store = MockObjectStore::new();
        assert!(matches!(
            store.head("b", "k").await.unwrap_err(),
            ObjectStoreError::NotFound
        ));
        store.put("b", "k", b"{}".to_vec());
        store.head("b", "k").await.unwrap();
        assert_eq!(store.get("b", "k").await.unwrap(), b"{}".to_vec());
    }
}
