#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Engine-agnostic image-variant pipeline.
//!
//! The pipeline has three stages: [`parse`] turns a raw path, query
//! parameters, and headers into a normalized [`EditDescriptor`];
//! [`derive_processed_key`] maps the descriptor onto a deterministic
//! object-store key for the requested variant; and [`VariantResolver`] runs
//! the cache-aside decision procedure against the [`ObjectStore`] and
//! [`TransformEngine`] collaborators, yielding an [`OriginDecision`].
//!
//! Determinism is the point of the design: semantically identical requests
//! must resolve to byte-identical processed keys so that edge and origin
//! caches converge on a single stored artifact.

/// Typed errors for request parsing and key derivation.
pub mod error;
/// Deterministic processed-key derivation.
pub mod key;
/// Edit-descriptor model and transform DTOs.
pub mod model;
/// Edit-request parsing from raw request components.
pub mod parse;
/// Cache-aside orchestration over the collaborator traits.
pub mod resolver;

pub use error::RequestError;
pub use key::derive_processed_key;
pub use model::{
    CacheMetadata, EditDescriptor, FitMode, OriginDecision, ReformatSpec, ResizeSpec,
    SUPPORTED_FORMATS, TransformSpec,
};
pub use parse::{AUTO_WEBP_HEADER, parse};
pub use resolver::{ObjectStore, TransformEngine, VariantResolver};
