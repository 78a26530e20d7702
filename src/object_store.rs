//! The result object store, abstracted to HEAD/GET (spec §6). Concrete
//! implementations live in [`mock`](crate::mock) and [`http`](crate::http);
//! production users typically wire in `aws-sdk-s3` behind this same trait.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from an [`ObjectStore`] operation.
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    /// The object does not exist yet (S3 404). The only error variant a
    /// [`RolloutFuture`](crate::rollout_future::RolloutFuture) treats as
    /// "not ready" rather than a hard failure.
    #[error("object not found")]
    NotFound,

    /// Any other failure (permission denied, network error, etc).
    #[error("object store error: {0}")]
    Other(String),
}

/// Abstraction over the result object store.
///
/// `head`/`get` operate on a `(bucket, key)` pair. The trait is object-safe
/// so it can be used as `Arc<dyn ObjectStore>` and shared between every
/// outstanding [`RolloutFuture`](crate::rollout_future::RolloutFuture).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check whether `key` exists in `bucket` without fetching its body.
    /// Returns `Err(ObjectStoreError::NotFound)` when absent; any other
    /// error propagates unchanged.
    async fn head(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError>;

    /// Fetch the raw bytes of `key` in `bucket`. Callers are expected to
    /// have already confirmed existence via [`head`](Self::head).
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError>;
}
