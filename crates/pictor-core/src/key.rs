//! Deterministic processed-key derivation.
//!
//! The processed key is what makes independently arriving, semantically
//! identical requests converge on one stored artifact: edit parameters are
//! appended in a fixed alphabetical order, lowercase, with the resolved
//! output extension re-appended last.

use crate::error::RequestError;
use crate::model::EditDescriptor;
use crate::parse::{DIMENSIONS_PARAM, QUALITY_PARAM};

use std::fmt::Write as _;

/// Derive the object-store key for the variant described by `descriptor`.
///
/// `resolved_format` is the externally requested format token; the
/// `jpg -> jpeg` alias is deliberately not applied here, since the key
/// reflects what the client asked for rather than what is handed to the
/// codec.
///
/// # Errors
///
/// Returns [`RequestError::MalformedKey`] when `master_key` carries no
/// extension.
pub fn derive_processed_key(
    master_key: &str,
    descriptor: &EditDescriptor,
    resolved_format: &str,
) -> Result<String, RequestError> {
    let Some(ext_idx) = master_key.rfind('.') else {
        return Err(RequestError::MalformedKey {
            key: master_key.to_string(),
        });
    };

    let mut key = master_key[..ext_idx].to_string();

    // Parameters are appended in alphabetical order: dimensions before
    // quality. Reordering would fork the cache for equal requests.
    if let Some(width) = descriptor.width {
        let _ = write!(key, "_{DIMENSIONS_PARAM}{width}");
        if let Some(height) = descriptor.height {
            let _ = write!(key, "x{height}");
        }
    }
    if let Some(quality) = descriptor.quality {
        let _ = write!(key, "_{QUALITY_PARAM}{quality}");
    }

    key.push('.');
    key.push_str(resolved_format);
    Ok(key)
}
