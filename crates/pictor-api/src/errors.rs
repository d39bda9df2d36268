//! Response and server error types.

use std::io;
use std::net::SocketAddr;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pictor_core::RequestError;
use serde::Serialize;
use thiserror::Error;

/// Errors hosting the API server itself.
#[derive(Debug, Error)]
pub enum ApiServerError {
    /// The listener could not be bound.
    #[error("failed to bind api listener")]
    Bind {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The server loop failed.
    #[error("api server failed")]
    Serve {
        /// Underlying IO error.
        source: io::Error,
    },
}

/// Structured error response returned to clients.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    kind: &'static str,
    detail: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str) -> Self {
        Self {
            status,
            kind,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Path was missing the hash token or extension.
    pub(crate) fn invalid_request(path: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request")
            .with_detail(format!("request path carries no image hash or extension: {path}"))
    }

    /// Parse-time failure surfaced to the client.
    pub(crate) fn from_request_error(err: &RequestError) -> Self {
        match err {
            RequestError::UnsupportedFormat { format, supported } => {
                Self::new(StatusCode::BAD_REQUEST, "unsupported_format").with_detail(format!(
                    "unsupported image format: {format}; supported: {}",
                    supported.join(", ")
                ))
            }
            RequestError::MalformedKey { key } => {
                Self::new(StatusCode::BAD_REQUEST, "malformed_key")
                    .with_detail(format!("master key has no extension: {key}"))
            }
        }
    }

    /// A collaborator failed; the client sees a constant message.
    pub(crate) const fn upstream() -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "upstream_failure")
    }

    /// Metrics exposition failed.
    pub(crate) const fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind,
            detail: self.detail.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}
