//! Typed edit-descriptor model and transform DTOs.
//!
//! # Design
//! - [`EditDescriptor`] is an immutable value built once per request from
//!   untrusted input; invalidity is encoded in the value, never thrown.
//! - The `jpg -> jpeg` alias lives at the engine/content-type boundary only.
//!   The cache key keeps the externally requested token so the key remains a
//!   pure function of what the client asked for.

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Image formats the pipeline can serve as transformation targets.
pub const SUPPORTED_FORMATS: &[&str] = &["jpg", "jpeg", "png", "webp", "tiff", "heif", "raw"];

/// Format token used for opportunistic WebP negotiation.
pub(crate) const WEBP: &str = "webp";

/// Normalized representation of one edit request.
///
/// A descriptor is valid when the hash token, master key, and original
/// format were all recoverable from the path; an invalid descriptor must be
/// short-circuited before it reaches the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditDescriptor {
    /// Raw path component of the request.
    pub url_path: String,
    /// Content-uniqueness token embedded in the path.
    pub image_hash: Option<String>,
    /// Object-store key of the unedited master image.
    pub master_key: Option<String>,
    /// Lowercased file extension of the master key.
    pub original_format: Option<String>,
    /// Requested resize width in pixels.
    pub width: Option<u32>,
    /// Requested resize height in pixels; only ever present with a width.
    pub height: Option<u32>,
    /// Requested lossy-encode quality.
    pub quality: Option<u8>,
    /// Whether opportunistic WebP negotiation is enabled for this request.
    pub auto_webp: bool,
    /// Resolved output format, lowercase, as the client requested it.
    pub new_format: Option<String>,
}

impl EditDescriptor {
    /// A descriptor is valid iff the hash token, master key, and original
    /// format are all present.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.image_hash.is_some() && self.master_key.is_some() && self.original_format.is_some()
    }

    /// Resize is requested iff a width is present.
    #[must_use]
    pub const fn needs_resize(&self) -> bool {
        self.width.is_some()
    }

    /// Quality reduction is requested iff a quality is present.
    #[must_use]
    pub const fn needs_quality_reduction(&self) -> bool {
        self.quality.is_some()
    }

    /// Reformat is requested iff the resolved format differs from the
    /// original.
    #[must_use]
    pub fn needs_reformat(&self) -> bool {
        self.new_format != self.original_format
    }

    /// Whether any kind of edit was requested.
    #[must_use]
    pub fn needs_edits(&self) -> bool {
        self.needs_resize() || self.needs_quality_reduction() || self.needs_reformat()
    }

    /// Resize dimensions and fit mode, when resize was requested.
    ///
    /// The fit mode is a pure function of the descriptor: `fill` when an
    /// explicit height is present, `inside` (bounded, no upscale) otherwise.
    #[must_use]
    pub const fn resize_spec(&self) -> Option<ResizeSpec> {
        match self.width {
            Some(width) => Some(ResizeSpec {
                width,
                height: self.height,
                fit: if self.height.is_some() {
                    FitMode::Fill
                } else {
                    FitMode::Inside
                },
            }),
            None => None,
        }
    }

    /// Output format as handed to the transform engine, with the
    /// `jpg -> jpeg` alias applied.
    #[must_use]
    pub fn engine_format(&self) -> Option<String> {
        self.new_format.as_deref().map(|format| {
            if format == "jpg" {
                "jpeg".to_string()
            } else {
                format.to_string()
            }
        })
    }

    /// Content type of the served variant, `image/<engine format>`.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.engine_format().map(|format| format!("image/{format}"))
    }

    /// Full transform specification derived from the descriptor.
    ///
    /// The quality override is attached only when quality reduction was
    /// requested; otherwise the engine encodes at its default quality.
    #[must_use]
    pub fn transform_spec(&self) -> TransformSpec {
        TransformSpec {
            resize: self.resize_spec(),
            reformat: self.engine_format().map(|format| ReformatSpec {
                format,
                quality: self.quality,
            }),
        }
    }
}

/// Resize behaviour requested of the transform engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSpec {
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels, when an exact fit was requested.
    pub height: Option<u32>,
    /// Fit mode derived from the presence of an explicit height.
    pub fit: FitMode,
}

/// Resize fit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Exact width and height, possibly distorting the aspect ratio.
    Fill,
    /// Bounded by the width, preserving aspect ratio, never upscaling.
    Inside,
}

impl FitMode {
    /// Render the fit mode as its lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::Inside => "inside",
        }
    }
}

/// Reformat behaviour requested of the transform engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReformatSpec {
    /// Target encoding, with the `jpg -> jpeg` alias already applied.
    pub format: String,
    /// Quality override; absent means the engine's default quality.
    pub quality: Option<u8>,
}

/// Full transformation requested of the engine for one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSpec {
    /// Resize step, when requested.
    pub resize: Option<ResizeSpec>,
    /// Encoding step; present for every valid descriptor so resized output
    /// is re-encoded even when the format is unchanged.
    pub reformat: Option<ReformatSpec>,
}

/// Cache-lifetime metadata attached to stored variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMetadata {
    /// `Cache-Control` directive for the stored object.
    pub cache_control: String,
    /// Far-future expiry timestamp.
    pub expires: DateTime<Utc>,
    /// Object tagging so derived variants can be garbage-collected.
    pub tagging: String,
}

impl CacheMetadata {
    /// Metadata marking a stored object as a long-lived, immutable derived
    /// cache entry under a 30-day retention tag.
    #[must_use]
    pub fn derived_variant() -> Self {
        Self {
            cache_control: "no-transform, max-age=31536000, s-maxage=2592000, immutable"
                .to_string(),
            expires: Utc::now() + TimeDelta::days(365),
            tagging: "x-cvt-retention=30".to_string(),
        }
    }
}

/// Outcome of the cache-aside decision procedure for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginDecision {
    /// The processed variant already exists; serve it from the store.
    CacheHit {
        /// Key of the stored variant to serve.
        served_key: String,
    },
    /// Serve the master image unchanged.
    Fallback {
        /// Master key to serve.
        served_key: String,
    },
    /// A variant was freshly transformed and written back.
    Transformed {
        /// Key the variant was stored under.
        served_key: String,
        /// Content type of the payload.
        content_type: String,
        /// Transformed bytes, ready to serve directly.
        payload: Bytes,
    },
}

impl OriginDecision {
    /// Machine-friendly discriminator, used as a metrics label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CacheHit { .. } => "cache_hit",
            Self::Fallback { .. } => "fallback",
            Self::Transformed { .. } => "transformed",
        }
    }

    /// Object-store key this decision serves from.
    #[must_use]
    pub fn served_key(&self) -> &str {
        match self {
            Self::CacheHit { served_key }
            | Self::Fallback { served_key }
            | Self::Transformed { served_key, .. } => served_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> EditDescriptor {
        EditDescriptor {
            url_path: "images/abc!_!h1.jpg".to_string(),
            image_hash: Some("h1".to_string()),
            master_key: Some("images/abc.jpg".to_string()),
            original_format: Some("jpg".to_string()),
            width: None,
            height: None,
            quality: None,
            auto_webp: false,
            new_format: Some("jpg".to_string()),
        }
    }

    #[test]
    fn validity_requires_all_three_identity_fields() {
        let mut desc = descriptor();
        assert!(desc.is_valid());
        desc.image_hash = None;
        assert!(!desc.is_valid());
    }

    #[test]
    fn fit_mode_is_fill_only_with_explicit_height() {
        let mut desc = descriptor();
        desc.width = Some(400);
        let spec = desc.resize_spec().expect("resize requested");
        assert_eq!(spec.fit, FitMode::Inside);
        assert_eq!(spec.height, None);

        desc.height = Some(300);
        let spec = desc.resize_spec().expect("resize requested");
        assert_eq!(spec.fit, FitMode::Fill);
        assert_eq!(spec.height, Some(300));
    }

    #[test]
    fn jpg_alias_applies_to_engine_format_and_content_type_only() {
        let desc = descriptor();
        assert_eq!(desc.new_format.as_deref(), Some("jpg"));
        assert_eq!(desc.engine_format().as_deref(), Some("jpeg"));
        assert_eq!(desc.content_type().as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn quality_only_request_still_needs_edits() {
        let mut desc = descriptor();
        assert!(!desc.needs_edits());
        desc.quality = Some(80);
        assert!(desc.needs_edits());
        let spec = desc.transform_spec();
        let reformat = spec.reformat.expect("reformat spec present");
        assert_eq!(reformat.format, "jpeg");
        assert_eq!(reformat.quality, Some(80));
    }

    #[test]
    fn reformat_request_carries_no_quality_unless_asked() {
        let mut desc = descriptor();
        desc.new_format = Some("webp".to_string());
        assert!(desc.needs_reformat());
        let reformat = desc.transform_spec().reformat.expect("reformat present");
        assert_eq!(reformat.format, "webp");
        assert_eq!(reformat.quality, None);
    }

    #[test]
    fn derived_variant_metadata_is_immutable_and_tagged() {
        let metadata = CacheMetadata::derived_variant();
        assert!(metadata.cache_control.contains("immutable"));
        assert!(metadata.cache_control.contains("max-age=31536000"));
        assert_eq!(metadata.tagging, "x-cvt-retention=30");
        assert!(metadata.expires > Utc::now());
    }

    #[test]
    fn decision_kind_labels_are_stable() {
        let hit = OriginDecision::CacheHit {
            served_key: "a.jpg".to_string(),
        };
        assert_eq!(hit.kind(), "cache_hit");
        assert_eq!(hit.served_key(), "a.jpg");
    }
}
