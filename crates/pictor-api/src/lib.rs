#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! HTTP delivery surface for the variant pipeline.
//!
//! The entry point is deliberately thin: it frames the raw request into the
//! parser's inputs, short-circuits invalid descriptors, and applies the
//! resolver's origin decision as either a redirect to the store or a direct
//! payload response.

/// Response and server error types.
pub mod errors;
/// Request handlers.
pub mod handlers;
/// Router construction and server host.
pub mod router;
/// Shared application state.
pub mod state;

pub use errors::ApiServerError;
pub use router::ApiServer;
pub use state::ApiState;
