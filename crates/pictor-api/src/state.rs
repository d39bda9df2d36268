//! Shared application state threaded through the handlers.

use std::sync::Arc;

use pictor_core::VariantResolver;
use pictor_telemetry::Metrics;

/// State shared by every handler.
pub struct ApiState {
    /// Cache-aside resolver over the wired collaborators.
    pub resolver: Arc<VariantResolver>,
    /// Shared metrics registry.
    pub metrics: Metrics,
    /// Public domain of the object store, used for redirect targets.
    pub store_domain: String,
}

impl ApiState {
    /// Construct the shared state.
    #[must_use]
    pub fn new(resolver: Arc<VariantResolver>, metrics: Metrics, store_domain: String) -> Self {
        Self {
            resolver,
            metrics,
            store_domain,
        }
    }
}
