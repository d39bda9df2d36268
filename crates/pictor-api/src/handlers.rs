//! Request handlers for the delivery surface.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use pictor_core::{AUTO_WEBP_HEADER, OriginDecision};
use serde::Serialize;
use tracing::{error, info};

use crate::errors::ApiError;
use crate::state::ApiState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    let exposition = state.metrics.export().map_err(|err| {
        error!(error = %err, "metrics exposition failed");
        ApiError::internal()
    })?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        exposition,
    )
        .into_response())
}

/// Serve one image-variant request.
///
/// Invalid descriptors short-circuit before the resolver runs; collaborator
/// failures map to a constant upstream error so partial results are never
/// cached or served.
pub(crate) async fn serve_image(
    State(state): State<Arc<ApiState>>,
    Path(path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let feature_headers = feature_headers(&headers);

    let descriptor = pictor_core::parse(&path, &params, accept, &feature_headers)
        .map_err(|err| ApiError::from_request_error(&err))?;

    if !descriptor.is_valid() {
        info!(path = %path, "request without image hash or extension");
        state.metrics.record_decision("invalid");
        return Err(ApiError::invalid_request(&path));
    }

    let decision = state.resolver.resolve(&descriptor).await.map_err(|err| {
        error!(path = %path, error = %format!("{err:#}"), "variant resolution failed");
        ApiError::upstream()
    })?;

    Ok(apply_decision(&state.store_domain, decision))
}

/// Map an origin decision onto a transport response: stored objects become
/// redirects to the store domain, fresh payloads are served directly.
fn apply_decision(store_domain: &str, decision: OriginDecision) -> Response {
    match decision {
        OriginDecision::CacheHit { served_key } | OriginDecision::Fallback { served_key } => {
            let location = format!("https://{store_domain}/{served_key}");
            Response::builder()
                .status(StatusCode::FOUND)
                .header(header::LOCATION, location)
                .body(Body::empty())
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        OriginDecision::Transformed {
            content_type,
            payload,
            ..
        } => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type)],
            payload,
        )
            .into_response(),
    }
}

/// Extract the deployment feature headers the parser understands.
fn feature_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut features = HashMap::new();
    if let Some(value) = headers
        .get(AUTO_WEBP_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        features.insert(AUTO_WEBP_HEADER.to_string(), value.to_string());
    }
    features
}
