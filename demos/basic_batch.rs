//! Submit a handful of jobs against an in-memory mock backend and stream
//! results as they complete.
//!
//! Run with: `cargo run --example basic_batch`

use agentcore_rollout_client::batch::BatchConfig;
use agentcore_rollout_client::mock::{MockObjectStore, MockRuntimeTransport};
use agentcore_rollout_client::{ClientConfig, RolloutClient};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let transport = Arc::new(MockRuntimeTransport::new());
    let store = Arc::new(MockObjectStore::auto_complete());

    let config = ClientConfig::new(
        "arn:aws:bedrock-agentcore:us-west-2:111122223333:runtime/demo-agent",
        "demo-results-bucket",
        "demo-experiment",
    )
    .with_tps_limit(10);

    let mut client = RolloutClient::new(transport, store, config)?;

    let payloads = vec![
        json!({"prompt": "summarize the attached log"}),
        json!({"prompt": "classify this support ticket"}),
        json!({"prompt": "extract entities from this paragraph"}),
    ];

    let batch_config = BatchConfig::new(2).with_timeout(std::time::Duration::from_secs(30));
    let mut stream = client.run_batch(payloads, batch_config);

    while let Some(item) = stream.next().await {
        if item.success {
            println!("job {} completed in {:?}: {}", item.index, item.elapsed, item.result.unwrap());
        } else {
            println!("job {} failed: {}", item.index, item.error.unwrap_or_default());
        }
    }

    Ok(())
}
