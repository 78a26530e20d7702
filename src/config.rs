//! Configuration: ARN parsing, client tunables, and the embedded rollout
//! config assembled into each submission.

use crate::error::{Result, RolloutError};
use serde_json::{Map, Value};

/// Extract the AWS region from an ARN.
///
/// ARN format: `arn:partition:service:region:account-id:resource-type/resource-id`.
/// The region field (index 3, 0-indexed on `:`) must be non-empty.
pub fn region_from_arn(arn: &str) -> Result<String> {
    let parts: Vec<&str> = arn.split(':').collect();
    match parts.get(3) {
        Some(region) if !region.is_empty() => Ok(region.to_string()),
        _ => Err(RolloutError::Configuration(format!(
            "invalid ARN format, cannot extract region: {arn}"
        ))),
    }
}

/// Construction inputs for [`RolloutClient`](crate::client::RolloutClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// ARN of the agent runtime to invoke.
    pub agent_runtime_arn: String,
    /// Default S3 bucket for rollout results.
    pub s3_bucket: String,
    /// Experiment id, used to namespace result keys.
    pub exp_id: String,
    /// Submissions per second cap. Default: 25.
    pub tps_limit: u32,
    /// Max transport-level retry attempts on throttling/server-busy, default
    /// 5. The client itself never retries (see `RuntimeTransport::submit`);
    /// this is a construction input for whoever builds the concrete
    /// transport (e.g. `HttpRuntimeTransport::new`), carried here so one
    /// `ClientConfig` can describe the whole client+transport setup.
    pub max_retry_attempts: u32,
    /// Optional vLLM/SGLang-style inference server URL, passed through to the runtime.
    pub base_url: Option<String>,
    /// Optional model id, passed through to the runtime.
    pub model_id: Option<String>,
    /// Arbitrary extra fields merged into every rollout config (e.g. sampling params).
    pub extra_config: Map<String, Value>,
}

impl ClientConfig {
    /// Start building a config with the required fields; optional fields
    /// default per spec §6.
    pub fn new(
        agent_runtime_arn: impl Into<String>,
        s3_bucket: impl Into<String>,
        exp_id: impl Into<String>,
    ) -> Self {
        Self {
            agent_runtime_arn: agent_runtime_arn.into(),
            s3_bucket: s3_bucket.into(),
            exp_id: exp_id.into(),
            tps_limit: 25,
            max_retry_attempts: 5,
            base_url: None,
            model_id: None,
            extra_config: Map::new(),
        }
    }

    pub fn with_tps_limit(mut self, tps_limit: u32) -> Self {
        self.tps_limit = tps_limit;
        self
    }

    pub fn with_max_retry_attempts(mut self, max_retry_attempts: u32) -> Self {
        self.max_retry_attempts = max_retry_attempts;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_extra_config(mut self, extra_config: Map<String, Value>) -> Self {
        self.extra_config = extra_config;
        self
    }
}

/// The `_rollout` sub-record embedded into a submission payload.
///
/// Absent entirely ⇒ fire-and-forget mode (spec §8 scenario 6); present but
/// missing a required field is a [`RolloutError::Configuration`] on the
/// server side — this crate only ever constructs complete records.
#[derive(Debug, Clone)]
pub struct RolloutConfig {
    pub exp_id: String,
    pub session_id: String,
    pub input_id: String,
    pub s3_bucket: String,
    pub base_url: Option<String>,
    pub model_id: Option<String>,
    pub extra: Map<String, Value>,
}

impl RolloutConfig {
    /// The deterministic result key: `"{exp_id}/{input_id}_{session_id}.json"`.
    pub fn result_key(&self) -> String {
        format!("{}/{}_{}.json", self.exp_id, self.input_id, self.session_id)
    }

    /// Serialize into the JSON object embedded under `_rollout`.
    pub fn to_value(&self) -> Value {
        let mut obj = self.extra.clone();
        obj.insert("exp_id".into(), Value::String(self.exp_id.clone()));
        obj.insert("session_id".into(), Value::String(self.session_id.clone()));
        obj.insert("input_id".into(), Value::String(self.input_id.clone()));
        obj.insert("s3_bucket".into(), Value::String(self.s3_bucket.clone()));
        if let Some(ref url) = self.base_url {
            obj.insert("base_url".into(), Value::String(url.clone()));
        }
        if let Some(ref model) = self.model_id {
            obj.insert("model_id".into(), Value::String(model.clone()));
        }
        Value::Object(obj)
    }
}
