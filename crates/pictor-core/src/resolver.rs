//! Cache-aside orchestration over the collaborator traits.
//!
//! The resolver is stateless across calls: every request recomputes the
//! processed key and probes the store from scratch. Two concurrent identical
//! misses may both transform and both write; derivation is deterministic, so
//! the redundant write is idempotent in content.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use pictor_telemetry::Metrics;
use tracing::{debug, info};

use crate::key::derive_processed_key;
use crate::model::{CacheMetadata, EditDescriptor, OriginDecision, TransformSpec};

/// Object-store collaborator consumed by the resolver.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether an object exists under `key`. A not-found condition resolves
    /// to `Ok(false)`; any other failure propagates.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Fetch the object stored under `key`.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Create an object under `key` with the given content type and
    /// cache-lifetime metadata. Keys are only ever created, never updated in
    /// place.
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
        metadata: &CacheMetadata,
    ) -> Result<()>;
}

/// Image transform collaborator consumed by the resolver.
#[async_trait]
pub trait TransformEngine: Send + Sync {
    /// Apply `spec` to `source`, returning the encoded variant bytes.
    async fn transform(&self, source: Bytes, spec: &TransformSpec) -> Result<Bytes>;
}

/// Runs the cache-aside decision procedure for validated edit descriptors.
pub struct VariantResolver {
    store: Arc<dyn ObjectStore>,
    engine: Arc<dyn TransformEngine>,
    metrics: Metrics,
}

impl VariantResolver {
    /// Construct a resolver over the shared collaborators.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, engine: Arc<dyn TransformEngine>, metrics: Metrics) -> Self {
        Self {
            store,
            engine,
            metrics,
        }
    }

    /// Resolve one descriptor to an [`OriginDecision`].
    ///
    /// Absence at the store is a normal transition, never an error; the only
    /// failures are collaborator failures and a descriptor that should have
    /// been short-circuited by the caller.
    ///
    /// # Errors
    ///
    /// Fails when called with an invalid descriptor, when key derivation
    /// fails, or when a collaborator call fails.
    pub async fn resolve(&self, descriptor: &EditDescriptor) -> Result<OriginDecision> {
        let (Some(master_key), Some(format)) = (
            descriptor.master_key.as_deref(),
            descriptor.new_format.as_deref(),
        ) else {
            bail!(
                "invalid edit descriptor reached the resolver: {}",
                descriptor.url_path
            );
        };
        if !descriptor.is_valid() {
            bail!(
                "invalid edit descriptor reached the resolver: {}",
                descriptor.url_path
            );
        }

        let processed_key = derive_processed_key(master_key, descriptor, format)
            .context("processed key derivation")?;

        let processed_exists = self
            .store
            .exists(&processed_key)
            .await
            .with_context(|| format!("probe processed object {processed_key}"))?;
        self.metrics.record_probe(processed_exists);
        if processed_exists {
            debug!(key = %processed_key, "processed variant already stored");
            self.metrics.record_decision("cache_hit");
            return Ok(OriginDecision::CacheHit {
                served_key: processed_key,
            });
        }

        if !descriptor.needs_edits() {
            debug!(key = %master_key, "no edits requested, serving master");
            self.metrics.record_decision("fallback");
            return Ok(OriginDecision::Fallback {
                served_key: master_key.to_string(),
            });
        }

        let master_exists = self
            .store
            .exists(master_key)
            .await
            .with_context(|| format!("probe master object {master_key}"))?;
        self.metrics.record_probe(master_exists);
        if !master_exists {
            info!(key = %master_key, "master image missing, falling back to master key");
            self.metrics.record_decision("fallback");
            return Ok(OriginDecision::Fallback {
                served_key: master_key.to_string(),
            });
        }

        let source = self
            .store
            .get(master_key)
            .await
            .with_context(|| format!("fetch master object {master_key}"))?;

        let spec = descriptor.transform_spec();
        let start = Instant::now();
        let transformed = self.engine.transform(source, &spec).await;
        self.metrics.record_transform(transformed.is_ok());
        let payload =
            transformed.with_context(|| format!("transform master object {master_key}"))?;
        info!(
            key = %processed_key,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "transformed master into variant"
        );

        let content_type = descriptor
            .content_type()
            .unwrap_or_else(|| format!("image/{format}"));
        self.store
            .put(
                &processed_key,
                &content_type,
                payload.clone(),
                &CacheMetadata::derived_variant(),
            )
            .await
            .with_context(|| format!("store processed object {processed_key}"))?;
        self.metrics.record_variant_write();

        self.metrics.record_decision("transformed");
        Ok(OriginDecision::Transformed {
            served_key: processed_key,
            content_type,
            payload,
        })
    }
}
