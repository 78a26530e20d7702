//! End-to-end scenarios exercising only the public API: submit a batch
//! against an in-memory backend and assert on what comes out the other end.

use agentcore_rollout_client::batch::BatchConfig;
use agentcore_rollout_client::events::{Event, EventHandler};
use agentcore_rollout_client::mock::{MockObjectStore, MockRuntimeTransport, SubmitOutcome};
use agentcore_rollout_client::transport::SubmitResponse;
use agentcore_rollout_client::{ClientConfig, RolloutClient};
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn config() -> ClientConfig {
    ClientConfig::new(
        "arn:aws:bedrock-agentcore:us-east-1:999988887777:runtime/scenario-agent",
        "scenario-bucket",
        "scenario-exp",
    )
    .with_tps_limit(1000)
}

#[tokio::test]
async fn happy_path_delivers_every_job_exactly_once() {
    let transport = Arc::new(MockRuntimeTransport::new());
    let store = Arc::new(MockObjectStore::auto_complete());
    let mut client = RolloutClient::new(transport.clone(), store, config()).unwrap();

    let payloads: Vec<_> = (0..5).map(|i| json!({"prompt": format!("job {i}")})).collect();
    let mut stream = client.run_batch(payloads, BatchConfig::new(3));

    let mut seen = HashSet::new();
    while let Some(item) = stream.next().await {
        assert!(item.success, "job {} unexpectedly failed: {:?}", item.index, item.error);
        assert!(seen.insert(item.index), "job {} yielded twice", item.index);
    }
    assert_eq!(seen, (0..5).collect());
    assert_eq!(transport.submit_calls(), 5);
}

#[tokio::test]
async fn one_bad_submission_does_not_sink_the_rest() {
    let transport = Arc::new(MockRuntimeTransport::with_outcomes(vec![
        SubmitOutcome::Ok(SubmitResponse {
            status: "processing".into(),
            s3_bucket: Some("scenario-bucket".into()),
            result_key: Some("scenario-exp/c.json".into()),
        }),
        SubmitOutcome::Err("runtime unavailable".into()),
        SubmitOutcome::Ok(SubmitResponse {
            status: "processing".into(),
            s3_bucket: Some("scenario-bucket".into()),
            result_key: Some("scenario-exp/a.json".into()),
        }),
    ]));
    let store = Arc::new(MockObjectStore::new());
    store.put("scenario-bucket", "scenario-exp/a.json", br#"{"which":"a"}"#.to_vec());
    store.put("scenario-bucket", "scenario-exp/c.json", br#"{"which":"c"}"#.to_vec());

    let mut client = RolloutClient::new(transport, store, config()).unwrap();
    let payloads = vec![json!({"p": 0}), json!({"p": 1}), json!({"p": 2})];
    let mut stream = client.run_batch(payloads, BatchConfig::new(3));

    let mut items = Vec::new();
    while let Some(item) = stream.next().await {
        items.push(item);
    }

    assert_eq!(items.len(), 3);
    let failed: Vec<_> = items.iter().filter(|i| !i.success).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].index, 1);
    assert_eq!(failed[0].elapsed, Duration::ZERO);
    assert!(items.iter().filter(|i| i.success).all(|i| i.index != 1));

    // Pins which queued outcome landed on which index, catching any
    // regression to FIFO/LIFO outcome consumption order.
    let by_index = |i: usize| items.iter().find(|item| item.index == i).unwrap();
    assert_eq!(by_index(0).result.as_ref().unwrap()["which"], "c");
    assert_eq!(by_index(2).result.as_ref().unwrap()["which"], "a");
}

#[tokio::test]
async fn timed_out_job_is_cancelled_exactly_once() {
    let transport = Arc::new(MockRuntimeTransport::new());
    let store = Arc::new(MockObjectStore::new()); // never resolves
    let mut client = RolloutClient::new(transport.clone(), store, config()).unwrap();

    let mut batch_config = BatchConfig::new(1).with_timeout(Duration::from_millis(15));
    batch_config.initial_interval = Duration::from_millis(4);
    batch_config.max_interval = Duration::from_millis(4);

    let mut stream = client.run_batch(vec![json!({"p": "stuck"})], batch_config);
    let item = stream.next().await.unwrap();

    assert!(!item.success);
    assert!(item.error.unwrap().contains("Timeout"));
    assert_eq!(transport.stop_calls(), 1);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn empty_batch_terminates_with_zero_yields() {
    let transport = Arc::new(MockRuntimeTransport::new());
    let store = Arc::new(MockObjectStore::new());
    let mut client = RolloutClient::new(transport, store, config()).unwrap();

    let mut stream = client.run_batch(vec![], BatchConfig::new(5));
    assert!(stream.next().await.is_none());
}

#[derive(Default)]
struct RecordingHandler {
    events: Mutex<Vec<String>>,
}

impl EventHandler for RecordingHandler {
    fn on_event(&self, event: Event) {
        let label = match event {
            Event::SubmissionStarted { .. } => "started",
            Event::SubmissionSucceeded { .. } => "succeeded",
            Event::SubmissionFailed { .. } => "failed",
            Event::PollAttempt { .. } => "poll",
            Event::Completed { .. } => "completed",
            Event::TimedOut { .. } => "timed_out",
            Event::Cancelled { .. } => "cancelled",
            Event::TransportRetry { .. } => "retry",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

#[tokio::test]
async fn single_invoke_emits_submission_and_completion_events() {
    let transport = Arc::new(MockRuntimeTransport::new());
    let store = Arc::new(MockObjectStore::auto_complete());
    let handler = Arc::new(RecordingHandler::default());
    let mut client = RolloutClient::new(transport, store, config())
        .unwrap()
        .with_events(handler.clone());

    let mut future = client.invoke(json!({"prompt": "hi"}), None, None).await.unwrap();
    future.result(None).await.unwrap();

    let events = handler.events.lock().unwrap();
    assert!(events.contains(&"started".to_string()));
    assert!(events.contains(&"succeeded".to_string()));
}
