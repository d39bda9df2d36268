//! Prometheus-backed metrics registry and exposition helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes a minimal set of counters relevant to the variant pipeline.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    resolve_decisions_total: IntCounterVec,
    store_probes_total: IntCounterVec,
    transforms_total: IntCounterVec,
    variant_writes_total: IntCounter,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["route", "code"],
        )
        .map_err(register_error)?;
        let resolve_decisions_total = IntCounterVec::new(
            Opts::new(
                "resolve_decisions_total",
                "Origin decisions produced by the variant resolver",
            ),
            &["decision"],
        )
        .map_err(register_error)?;
        let store_probes_total = IntCounterVec::new(
            Opts::new(
                "store_probes_total",
                "Object store existence probes by result",
            ),
            &["result"],
        )
        .map_err(register_error)?;
        let transforms_total = IntCounterVec::new(
            Opts::new("transforms_total", "Transform engine invocations by status"),
            &["status"],
        )
        .map_err(register_error)?;
        let variant_writes_total = IntCounter::with_opts(Opts::new(
            "variant_writes_total",
            "Processed variants written back to the object store",
        ))
        .map_err(register_error)?;

        for collector in [
            Box::new(http_requests_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(resolve_decisions_total.clone()),
            Box::new(store_probes_total.clone()),
            Box::new(transforms_total.clone()),
            Box::new(variant_writes_total.clone()),
        ] {
            registry.register(collector).map_err(register_error)?;
        }

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                resolve_decisions_total,
                store_probes_total,
                transforms_total,
                variant_writes_total,
            }),
        })
    }

    /// Record one served HTTP request for the given route and status code.
    pub fn record_http_request(&self, route: &str, code: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &code.to_string()])
            .inc();
    }

    /// Record the resolver decision kind (`cache_hit`, `fallback`,
    /// `transformed`, or `invalid`).
    pub fn record_decision(&self, decision: &str) {
        self.inner
            .resolve_decisions_total
            .with_label_values(&[decision])
            .inc();
    }

    /// Record an object store existence probe outcome.
    pub fn record_probe(&self, found: bool) {
        let result = if found { "hit" } else { "miss" };
        self.inner
            .store_probes_total
            .with_label_values(&[result])
            .inc();
    }

    /// Record a transform engine invocation outcome.
    pub fn record_transform(&self, succeeded: bool) {
        let status = if succeeded { "ok" } else { "error" };
        self.inner
            .transforms_total
            .with_label_values(&[status])
            .inc();
    }

    /// Record a processed-variant write back to the store.
    pub fn record_variant_write(&self) {
        self.inner.variant_writes_total.inc();
    }

    /// Encode the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the exposition is not UTF-8.
    pub fn export(&self) -> Result<String, TelemetryError> {
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }
}

const fn register_error(source: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsRegister { source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_contains_registered_counters() -> Result<(), TelemetryError> {
        let metrics = Metrics::new()?;
        metrics.record_http_request("/{*path}", 200);
        metrics.record_decision("cache_hit");
        metrics.record_probe(true);
        metrics.record_transform(true);
        metrics.record_variant_write();

        let exposition = metrics.export()?;
        assert!(exposition.contains("http_requests_total"));
        assert!(exposition.contains("resolve_decisions_total"));
        assert!(exposition.contains("store_probes_total"));
        assert!(exposition.contains("transforms_total"));
        assert!(exposition.contains("variant_writes_total"));
        Ok(())
    }

    #[test]
    fn decision_labels_accumulate_independently() -> Result<(), TelemetryError> {
        let metrics = Metrics::new()?;
        metrics.record_decision("fallback");
        metrics.record_decision("fallback");
        metrics.record_decision("transformed");

        let exposition = metrics.export()?;
        assert!(exposition.contains("resolve_decisions_total{decision=\"fallback\"} 2"));
        assert!(exposition.contains("resolve_decisions_total{decision=\"transformed\"} 1"));
        Ok(())
    }
}
