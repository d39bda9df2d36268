#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! `image`-crate implementation of the [`TransformEngine`] collaborator.
//!
//! Decoding and encoding run on the blocking thread pool so the request
//! tasks stay responsive. Codec failures propagate; the engine makes no
//! correctness or quality guarantees beyond what the codecs provide.

/// Error types for transform operations.
pub mod error;

pub use error::TransformError;

use std::io::Cursor;
use std::time::Instant;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use pictor_core::{FitMode, ReformatSpec, TransformEngine, TransformSpec};
use tracing::debug;

const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Transform engine backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageTransformer;

impl ImageTransformer {
    /// Construct a new transformer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransformEngine for ImageTransformer {
    async fn transform(&self, source: Bytes, spec: &TransformSpec) -> anyhow::Result<Bytes> {
        let spec = spec.clone();
        let payload = tokio::task::spawn_blocking(move || apply(&source, &spec))
            .await
            .context("transform worker terminated")??;
        Ok(Bytes::from(payload))
    }
}

/// Apply one transform spec to encoded source bytes.
fn apply(source: &Bytes, spec: &TransformSpec) -> Result<Vec<u8>, TransformError> {
    let start = Instant::now();
    let mut img =
        image::load_from_memory(source).map_err(|source| TransformError::Decode { source })?;

    if let Some(resize) = spec.resize {
        img = resized(&img, resize.width, resize.height, resize.fit);
    }

    let payload = match &spec.reformat {
        Some(reformat) => encode(&img, reformat)?,
        // No target format was supplied; re-encode in the source format so
        // a resize still yields servable bytes.
        None => {
            let format = image::guess_format(source)
                .map_err(|source| TransformError::Decode { source })?;
            let mut out = Cursor::new(Vec::new());
            img.write_to(&mut out, format)
                .map_err(|source| TransformError::Encode {
                    format: format!("{format:?}"),
                    source,
                })?;
            out.into_inner()
        }
    };

    debug!(
        elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "applied transform spec"
    );
    Ok(payload)
}

/// Resize per the fit mode: `fill` stretches to the exact dimensions,
/// `inside` bounds by width, preserves aspect ratio, and never upscales.
fn resized(img: &DynamicImage, width: u32, height: Option<u32>, fit: FitMode) -> DynamicImage {
    match fit {
        FitMode::Fill => img.resize_exact(width, height.unwrap_or(width), RESIZE_FILTER),
        FitMode::Inside => {
            if img.width() <= width {
                img.clone()
            } else {
                img.resize(width, u32::MAX, RESIZE_FILTER)
            }
        }
    }
}

fn encode(img: &DynamicImage, reformat: &ReformatSpec) -> Result<Vec<u8>, TransformError> {
    let mut out = Cursor::new(Vec::new());
    match reformat.format.as_str() {
        "jpg" | "jpeg" => {
            // JPEG carries no alpha channel.
            let rgb = img.to_rgb8();
            match reformat.quality {
                Some(quality) => {
                    let encoder = JpegEncoder::new_with_quality(&mut out, quality.min(100));
                    rgb.write_with_encoder(encoder)
                }
                None => rgb.write_to(&mut out, ImageFormat::Jpeg),
            }
            .map_err(|source| TransformError::Encode {
                format: reformat.format.clone(),
                source,
            })?;
        }
        "png" => write_plain(img, &mut out, ImageFormat::Png, &reformat.format)?,
        "webp" => write_plain(img, &mut out, ImageFormat::WebP, &reformat.format)?,
        "tiff" => write_plain(img, &mut out, ImageFormat::Tiff, &reformat.format)?,
        other => {
            return Err(TransformError::UnsupportedCodec {
                format: other.to_string(),
            });
        }
    }
    Ok(out.into_inner())
}

fn write_plain(
    img: &DynamicImage,
    out: &mut Cursor<Vec<u8>>,
    format: ImageFormat,
    label: &str,
) -> Result<(), TransformError> {
    img.write_to(out, format)
        .map_err(|source| TransformError::Encode {
            format: label.to_string(),
            source,
        })
}
