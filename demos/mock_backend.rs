//! Single-job submission with an event handler, against a mock backend
//! that reports a permanent 404 so you can watch backoff and a manual
//! cancellation.
//!
//! Run with: `cargo run --example mock_backend`

use agentcore_rollout_client::events::{Event, FnEventHandler};
use agentcore_rollout_client::mock::{MockObjectStore, MockRuntimeTransport};
use agentcore_rollout_client::{ClientConfig, RolloutClient};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let transport = Arc::new(MockRuntimeTransport::new());
    let store = Arc::new(MockObjectStore::new()); // never seeded: result never appears

    let config = ClientConfig::new(
        "arn:aws:bedrock-agentcore:us-west-2:111122223333:runtime/demo-agent",
        "demo-results-bucket",
        "demo-experiment",
    );

    let handler = Arc::new(FnEventHandler(|event: Event| match event {
        Event::SubmissionSucceeded { result_key, .. } => println!("submitted, waiting on {result_key}"),
        Event::PollAttempt { next_poll_interval, .. } => println!("not ready yet, next poll in {next_poll_interval:?}"),
        Event::Cancelled { stop_session_ok, .. } => println!("cancelled (stop_session ok: {stop_session_ok})"),
        _ => {}
    }));

    let mut client = RolloutClient::new(transport, store, config)?.with_events(handler);

    let mut future = client.invoke(json!({"prompt": "this will never finish"}), None, None).await?;

    match future.result(Some(Duration::from_millis(200))).await {
        Ok(value) => println!("got result: {value}"),
        Err(e) => {
            println!("gave up waiting ({e}), cancelling");
            future.cancel().await;
        }
    }

    Ok(())
}
