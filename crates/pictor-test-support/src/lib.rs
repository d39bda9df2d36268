#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Shared test helpers used across integration suites.
//! Layout: mocks.rs (in-memory collaborators).

/// In-memory collaborator implementations.
pub mod mocks;

pub use mocks::{InMemoryObjectStore, StoredObject, StubTransformEngine};
