//! # agentcore-rollout-client
//!
//! Client for dispatching RL rollout jobs to a remote agent runtime and
//! collecting their results from an object store.
//!
//! A rollout is submitted with a JSON payload; the runtime executes it
//! out-of-band and writes its result as an object keyed by
//! `{exp_id}/{input_id}_{session_id}.json`. This crate submits payloads,
//! rate-limits and retries submission at the transport level, and polls
//! the object store with adaptive backoff until each result appears (or
//! its deadline elapses).
//!
//! ## Core Concepts
//!
//! - **[`RolloutClient`]** — submits payloads and returns [`RolloutFuture`]s,
//!   or runs a whole batch at once via [`RolloutClient::run_batch`].
//! - **[`RolloutFuture`]** — one outstanding job: `done()`/`result()`/`cancel()`.
//! - **[`BatchStream`](batch::BatchStream)** — schedules many payloads under a
//!   concurrency cap, yielding [`BatchItem`](batch::BatchItem)s in completion
//!   order.
//! - **[`RuntimeTransport`]** / **[`ObjectStore`]** — the two seams a caller
//!   implements to plug in a real backend (AgentCore + S3, a sidecar REST
//!   service, or anything else); [`mock`] provides in-memory test doubles,
//!   and [`http`] a generic `reqwest`-based reference implementation.
//! - **[`events`]** — optional, non-intrusive lifecycle observability.
//!
//! ## Quick Start
//!
//! ```no_run
//! use agentcore_rollout_client::{ClientConfig, RolloutClient};
//! use agentcore_rollout_client::http::{HttpObjectStore, HttpRuntimeTransport};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(HttpRuntimeTransport::new("http://localhost:8080", 5)?);
//!     let store = Arc::new(HttpObjectStore::new("http://localhost:8080")?);
//!     let config = ClientConfig::new(
//!         "arn:aws:bedrock-agentcore:us-west-2:111122223333:runtime/my-agent",
//!         "my-results-bucket",
//!         "experiment-1",
//!     );
//!
//!     let mut client = RolloutClient::new(transport, store, config)?;
//!     let mut future = client.invoke(json!({"prompt": "hello"}), None, None).await?;
//!     let result = future.result(None).await?;
//!     println!("{result}");
//!     Ok(())
//! }
//! ```
//!
//! ## Batch Quick Start
//!
//! ```no_run
//! # use agentcore_rollout_client::{ClientConfig, RolloutClient};
//! # use agentcore_rollout_client::http::{HttpObjectStore, HttpRuntimeTransport};
//! use agentcore_rollout_client::batch::BatchConfig;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run(mut client: RolloutClient) -> Result<(), Box<dyn std::error::Error>> {
//! let payloads = vec![json!({"prompt": "a"}), json!({"prompt": "b"})];
//! let config = BatchConfig::new(10);
//! let mut stream = client.run_batch(payloads, config);
//! while let Some(item) = stream.next().await {
//!     if item.success {
//!         println!("job {} done in {:?}", item.index, item.elapsed);
//!     } else {
//!         eprintln!("job {} failed: {:?}", item.index, item.error);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod mock;
pub mod object_store;
pub mod poll_backoff;
pub mod rate_limiter;
pub mod rollout_future;
pub mod transport;

pub use batch::{BatchConfig, BatchItem, BatchStream};
pub use client::RolloutClient;
pub use config::{ClientConfig, RolloutConfig};
pub use error::{Result, RolloutError};
pub use events::{Event, EventHandler, FnEventHandler};
pub use object_store::{ObjectStore, ObjectStoreError};
pub use rollout_future::RolloutFuture;
pub use transport::{RuntimeTransport, SubmitResponse};
