//! Error types for transform operations.

use thiserror::Error;

/// Errors produced by the image transform engine.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The source bytes could not be decoded as an image.
    #[error("image decode failed")]
    Decode {
        /// Underlying codec error.
        source: image::ImageError,
    },
    /// The image could not be encoded in the target format.
    #[error("image encode failed")]
    Encode {
        /// Target format that failed.
        format: String,
        /// Underlying codec error.
        source: image::ImageError,
    },
    /// The target format has no encoder in this engine.
    #[error("unsupported output codec")]
    UnsupportedCodec {
        /// Format that cannot be encoded.
        format: String,
    },
}
