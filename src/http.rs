//! Generic `reqwest`-based reference implementations of
//! [`RuntimeTransport`] and [`ObjectStore`].
//!
//! These talk to a plain REST sidecar (`POST /invocations`,
//! `POST /sessions/{id}/stop`, `HEAD`/`GET /objects/{bucket}/{key}`) rather
//! than AWS's actual AgentCore/S3 wire protocols — wiring up SigV4-signed
//! `aws-sdk-bedrockagentcore`/`aws-sdk-s3` clients behind these same traits
//! is the production path and out of scope here. Useful for local
//! integration testing against a sidecar, and as a template for a real
//! backend.

use crate::backoff::{with_backoff, BackoffConfig};
use crate::error::{RolloutError, Result};
use crate::events::{self, Event, EventHandler};
use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::transport::{RuntimeTransport, SubmitResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

async fn error_for_status(resp: reqwest::Response) -> RolloutError {
    let status = resp.status().as_u16();
    let retry_after = resp
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    let body = resp.text().await.unwrap_or_default();
    RolloutError::HttpError {
        status,
        body,
        retry_after,
    }
}

/// Submits via `POST {base_url}/invocations` and stops sessions via
/// `POST {base_url}/sessions/{session_id}/stop`.
///
/// `submit` is the MUST-retry operation per the transport contract: it runs
/// behind its own [`BackoffConfig`], retrying throttling/server-busy
/// responses up to `max_retry_attempts` times before the error reaches
/// [`RolloutClient::invoke`](crate::client::RolloutClient::invoke), which
/// calls it exactly once and never retries itself.
pub struct HttpRuntimeTransport {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
    backoff: BackoffConfig,
    events: Option<Arc<dyn EventHandler>>,
}

impl HttpRuntimeTransport {
    pub fn new(base_url: impl Into<String>, max_retry_attempts: u32) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
            backoff: BackoffConfig::with_max_retries(max_retry_attempts),
            events: None,
        })
    }

    pub fn with_client(base_url: impl Into<String>, client: Client, max_retry_attempts: u32) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
            backoff: BackoffConfig::with_max_retries(max_retry_attempts),
            events: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on every request, for a sidecar
    /// or presigned-URL fronting service that expects one.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Attach an event handler so `Event::TransportRetry` surfaces from this
    /// transport's own retry loop.
    pub fn with_events(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.events = Some(handler);
        self
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_submit(&self, runtime_arn: &str, session_id: &str, payload: &Value) -> Result<SubmitResponse> {
        let url = format!("{}/invocations", self.base_url);
        let req = self
            .client
            .post(&url)
            .header("X-Amzn-Bedrock-AgentCore-Runtime-Session-Id", session_id)
            .header("X-Amzn-Bedrock-AgentCore-Runtime-ARN", runtime_arn)
            .json(payload);
        let resp = self.auth(req).send().await?;

        if !resp.status().is_success() {
            return Err(error_for_status(resp).await);
        }

        let body: Value = resp.json().await?;
        Ok(SubmitResponse {
            status: body
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("processing")
                .to_string(),
            s3_bucket: body
                .get("s3_bucket")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            result_key: body
                .get("result_key")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }
}

#[async_trait]
impl RuntimeTransport for HttpRuntimeTransport {
    async fn submit(
        &self,
        runtime_arn: &str,
        session_id: &str,
        payload: &Value,
    ) -> Result<SubmitResponse> {
        let mut on_retry = |attempt: u32, delay: Duration, reason: &str| {
            events::emit(
                &self.events,
                Event::TransportRetry {
                    attempt,
                    delay,
                    reason: reason.to_string(),
                },
            );
        };
        with_backoff(&self.backoff, Some(&mut on_retry), || {
            self.send_submit(runtime_arn, session_id, payload)
        })
        .await
    }

    async fn stop_session(&self, runtime_arn: &str, session_id: &str) -> Result<()> {
        let url = format!("{}/sessions/{session_id}/stop", self.base_url);
        let req = self
            .client
            .post(&url)
            .header("X-Amzn-Bedrock-AgentCore-Runtime-ARN", runtime_arn);
        let resp = self.auth(req).send().await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_for_status(resp).await)
        }
    }
}

/// HEAD/GET against `{base_url}/objects/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        })
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn url(&self, bucket: &str, key: &str) -> String {
        format!("{}/objects/{bucket}/{key}", self.base_url)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn head(&self, bucket: &str, key: &str) -> std::result::Result<(), ObjectStoreError> {
        let req = self.client.head(self.url(bucket, key));
        let resp = self
            .auth(req)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Other(e.to_string()))?;

        match resp.status() {
            status if status.is_success() => Ok(()),
            status if status == reqwest::StatusCode::NOT_FOUND => Err(ObjectStoreError::NotFound),
            status => Err(ObjectStoreError::Other(format!("HEAD failed: {status}"))),
        }
    }

    async fn get(&self, bucket: &str, key: &str) -> std::result::Result<Vec<u8>, ObjectStoreError> {
        let req = self.client.get(self.url(bucket, key));
        let resp = self
            .auth(req)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Other(e.to_string()))?;

        match resp.status() {
            status if status.is_success() => resp
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| ObjectStoreError::Other(e.to_string())),
            status if status == reqwest::StatusCode::NOT_FOUND => Err(ObjectStoreError::NotFound),
            status => Err(ObjectStoreError::Other(format!("GET failed: {status}"))),
        }
    }
}
