//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use pictor_core::VariantResolver;
use pictor_telemetry::Metrics;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{Span, info, info_span};

use crate::errors::ApiServerError;
use crate::handlers::{healthz, metrics, serve_image};
use crate::state::ApiState;

/// Axum router wrapper that hosts the Pictor delivery surface.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct a new API server with shared dependencies wired through
    /// application state.
    #[must_use]
    pub fn new(resolver: Arc<VariantResolver>, telemetry: Metrics, store_domain: String) -> Self {
        let state = Arc::new(ApiState::new(resolver, telemetry, store_domain));
        Self::with_state(state)
    }

    fn with_state(state: Arc<ApiState>) -> Self {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<Body>| {
                info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_response(
                |response: &Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );

        let layered = ServiceBuilder::new()
            .layer(pictor_telemetry::set_request_id_layer())
            .layer(pictor_telemetry::propagate_request_id_layer())
            .layer(trace_layer);

        let router = Router::new()
            .route("/healthz", get(healthz))
            .route("/metrics", get(metrics))
            .route("/{*path}", get(serve_image))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                record_http_metrics,
            ))
            .layer(layered)
            .with_state(state);

        Self { router }
    }

    /// Consume the server and return its router, for in-process testing.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Bind the listener and serve until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or the server loop
    /// fails.
    pub async fn serve(self, addr: SocketAddr) -> Result<(), ApiServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        info!(%addr, "pictor api listening");
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })?;
        Ok(())
    }
}

/// Record one `http_requests_total` sample per served request, labelled by
/// matched route and status code.
async fn record_http_metrics(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |path| path.as_str().to_string());
    let response = next.run(request).await;
    state
        .metrics
        .record_http_request(&route, response.status().as_u16());
    response
}
