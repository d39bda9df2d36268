#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Typed configuration for the Pictor services.
//!
//! Configuration is resolved once at bootstrap from the environment into an
//! explicit [`AppConfig`] value that is passed into constructors; there is no
//! process-wide mutable configuration state.

/// Error types for configuration loading.
pub mod error;
/// Typed configuration models.
pub mod model;

pub use error::ConfigError;
pub use model::{AppConfig, HttpConfig, StoreProfile};

/// Load the application configuration from process environment variables.
///
/// # Errors
///
/// Returns an error when a required variable is missing or a value fails
/// validation.
pub fn load_from_env() -> Result<AppConfig, ConfigError> {
    AppConfig::from_lookup(|name| std::env::var(name).ok())
}
