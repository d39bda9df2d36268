//! Error types for object-store operations.
//!
//! # Design
//! - Constant messages with the key carried as context.
//! - SDK errors are boxed so callers never see the generic SDK types.

use thiserror::Error;

type BoxedSdkError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the S3 object store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HEAD request failed for a reason other than absence.
    #[error("object head request failed")]
    Head {
        /// Key being probed.
        key: String,
        /// Underlying SDK error.
        source: BoxedSdkError,
    },
    /// GET request failed or the body could not be collected.
    #[error("object fetch failed")]
    Get {
        /// Key being fetched.
        key: String,
        /// Underlying SDK error.
        source: BoxedSdkError,
    },
    /// PUT request failed.
    #[error("object write failed")]
    Put {
        /// Key being written.
        key: String,
        /// Underlying SDK error.
        source: BoxedSdkError,
    },
}
