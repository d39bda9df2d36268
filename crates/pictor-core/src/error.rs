//! # Design
//!
//! - Structured, constant-message errors for the request pipeline.
//! - Context fields carry the offending values so callers can render
//!   client-facing detail without string parsing.

use thiserror::Error;

/// Errors produced while parsing an edit request or deriving a variant key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// The resolved output format is not supported and differs from the
    /// master image's format.
    #[error("unsupported image format")]
    UnsupportedFormat {
        /// Format token the client asked for.
        format: String,
        /// Formats the pipeline can serve.
        supported: &'static [&'static str],
    },
    /// The master key carries no extension, so no variant key can be derived.
    #[error("master image key has no extension")]
    MalformedKey {
        /// Master key that failed derivation.
        key: String,
    },
}
