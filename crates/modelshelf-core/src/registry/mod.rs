//! Remote model registry - metadata lookups by content hash and model id.
//!
//! The organizer talks to the registry through the [`ModelRegistry`] trait.
//! [`RegistryClient`] implements it over HTTP against a Civitai-compatible
//! API; tests substitute an in-memory registry.

mod client;
pub mod retry;
mod types;

pub use client::RegistryClient;
pub use retry::{retry_async, RetryPolicy, RetryStats};
pub use types::{Creator, HashLookup, ModelDetails, ModelVersion, ModelVersionSummary, VersionModel};

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Lookup oracle for model metadata.
///
/// Implementations resolve transient failures internally; an `Err` is fatal
/// for the run.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Find the model version whose file has this SHA256.
    async fn lookup_by_hash(&self, hash: &str) -> Result<HashLookup>;

    /// Fetch the full model record for a model id.
    async fn lookup_by_id(&self, model_id: i64) -> Result<ModelDetails>;
}

#[async_trait]
impl<R: ModelRegistry + ?Sized> ModelRegistry for Arc<R> {
    async fn lookup_by_hash(&self, hash: &str) -> Result<HashLookup> {
        (**self).lookup_by_hash(hash).await
    }

    async fn lookup_by_id(&self, model_id: i64) -> Result<ModelDetails> {
        (**self).lookup_by_id(model_id).await
    }
}
