//! Edit-request parsing from the raw path, query parameters, and headers.
//!
//! Malformed paths never fail: invalidity is encoded in the descriptor's
//! identity fields. The only parse-time failure is an unsupported output
//! format, which is a client-visible error.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RequestError;
use crate::model::{EditDescriptor, SUPPORTED_FORMATS, WEBP};

/// Query parameter carrying the requested dimensions.
pub(crate) const DIMENSIONS_PARAM: &str = "d";
/// Query parameter carrying the requested quality.
pub(crate) const QUALITY_PARAM: &str = "q";
const FORMAT_PARAM: &str = "f";

/// Token separating the path prefix from the content hash.
const HASH_SEPARATOR: &str = "!_!";
/// Feature header enabling opportunistic WebP conversion.
pub const AUTO_WEBP_HEADER: &str = "x-cvt-auto-convert-to-webp";
const WEBP_CONTENT_TYPE: &str = "image/webp";

static DIMENSIONS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)x?(\d+)?$").expect("dimensions pattern is valid"));
static QUALITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+$").expect("quality pattern is valid"));

/// Parse a raw request into a normalized [`EditDescriptor`].
///
/// `feature_headers` carries deployment-injected headers such as
/// [`AUTO_WEBP_HEADER`]; `accept` is the raw `Accept` header value.
///
/// # Errors
///
/// Returns [`RequestError::UnsupportedFormat`] when the resolved output
/// format differs from the original and is outside [`SUPPORTED_FORMATS`].
/// Malformed paths and malformed parameters never error; they produce an
/// invalid descriptor or absent fields respectively.
pub fn parse(
    path: &str,
    query: &HashMap<String, String>,
    accept: &str,
    feature_headers: &HashMap<String, String>,
) -> Result<EditDescriptor, RequestError> {
    let (image_hash, master_key, original_format) = parse_image_path(path);
    let (width, height) = dimensions(query);
    let quality = quality(query);
    let auto_webp = feature_headers
        .get(AUTO_WEBP_HEADER)
        .is_some_and(|value| value == "true");
    let new_format = output_format(query, accept, original_format.as_deref(), auto_webp)?;

    Ok(EditDescriptor {
        url_path: path.to_string(),
        image_hash,
        master_key,
        original_format,
        width,
        height,
        quality,
        auto_webp,
        new_format,
    })
}

/// Recover the hash token, master key, and original format from the path.
///
/// The master key is the path with the hash token excised: everything before
/// the separator, re-joined with the lowercased extension.
fn parse_image_path(path: &str) -> (Option<String>, Option<String>, Option<String>) {
    let Some(hash_idx) = path.rfind(HASH_SEPARATOR) else {
        return (None, None, None);
    };
    let Some(ext_idx) = path.rfind('.') else {
        return (None, None, None);
    };
    // A dot before the separator means the path has no extension after the
    // hash token; treat it as malformed rather than slicing out of order.
    let Some(hash) = path.get(hash_idx + HASH_SEPARATOR.len()..ext_idx) else {
        return (None, None, None);
    };
    let ext = path[ext_idx + 1..].to_lowercase();
    let master_key = format!("{}.{ext}", &path[..hash_idx]);
    (Some(hash.to_string()), Some(master_key), Some(ext))
}

fn dimensions(query: &HashMap<String, String>) -> (Option<u32>, Option<u32>) {
    let Some(raw) = param(query, DIMENSIONS_PARAM) else {
        return (None, None);
    };
    let Some(captures) = DIMENSIONS_RE.captures(raw) else {
        return (None, None);
    };
    // Zero dimensions are treated as absent: a zero width drops the resize
    // entirely, a zero height degrades to a width-only resize.
    let width = captures
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
        .filter(|width| *width > 0);
    // Height may only accompany a width that parsed cleanly.
    let Some(width) = width else {
        return (None, None);
    };
    let height = captures
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .filter(|height| *height > 0);
    (Some(width), height)
}

fn quality(query: &HashMap<String, String>) -> Option<u8> {
    let raw = param(query, QUALITY_PARAM)?;
    if QUALITY_RE.is_match(raw) {
        // Values beyond the byte range are dropped; the encoder clamps the
        // rest to 100.
        raw.parse().ok()
    } else {
        None
    }
}

fn output_format(
    query: &HashMap<String, String>,
    accept: &str,
    original_format: Option<&str>,
    auto_webp: bool,
) -> Result<Option<String>, RequestError> {
    let Some(original) = original_format else {
        return Ok(None);
    };
    let resolved = match param(query, FORMAT_PARAM) {
        Some(requested) => requested.to_lowercase(),
        None if auto_webp && accept.contains(WEBP_CONTENT_TYPE) => WEBP.to_string(),
        None => original.to_string(),
    };
    if resolved != original && !SUPPORTED_FORMATS.contains(&resolved.as_str()) {
        return Err(RequestError::UnsupportedFormat {
            format: resolved,
            supported: SUPPORTED_FORMATS,
        });
    }
    Ok(Some(resolved))
}

/// Look up a query parameter, trying the exact uppercase key when the
/// lowercase key is absent or blank after trimming. No other casings are
/// attempted.
fn param<'a>(query: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    let lower = query
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty());
    if lower.is_some() {
        return lower;
    }
    query
        .get(&name.to_uppercase())
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn no_headers() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn plain_path_yields_valid_descriptor_with_no_edits() -> Result<(), RequestError> {
        let desc = parse("images/abc!_!h1.jpg", &query(&[]), "", &no_headers())?;
        assert!(desc.is_valid());
        assert_eq!(desc.image_hash.as_deref(), Some("h1"));
        assert_eq!(desc.master_key.as_deref(), Some("images/abc.jpg"));
        assert_eq!(desc.original_format.as_deref(), Some("jpg"));
        assert_eq!(desc.new_format.as_deref(), Some("jpg"));
        assert!(!desc.needs_edits());
        Ok(())
    }

    #[test]
    fn extension_is_lowercased_into_master_key() -> Result<(), RequestError> {
        let desc = parse("images/abc!_!h1.JPG", &query(&[]), "", &no_headers())?;
        assert_eq!(desc.master_key.as_deref(), Some("images/abc.jpg"));
        assert_eq!(desc.original_format.as_deref(), Some("jpg"));
        Ok(())
    }

    #[test]
    fn path_without_extension_is_invalid_not_an_error() -> Result<(), RequestError> {
        let desc = parse("images/abc!_!h1", &query(&[]), "", &no_headers())?;
        assert!(!desc.is_valid());
        assert_eq!(desc.image_hash, None);
        assert_eq!(desc.master_key, None);
        assert_eq!(desc.original_format, None);
        Ok(())
    }

    #[test]
    fn path_without_hash_separator_is_invalid() -> Result<(), RequestError> {
        let desc = parse("images/abc.jpg", &query(&[]), "", &no_headers())?;
        assert!(!desc.is_valid());
        Ok(())
    }

    #[test]
    fn dot_before_separator_is_invalid() -> Result<(), RequestError> {
        let desc = parse("images/a.b!_!h1", &query(&[]), "", &no_headers())?;
        assert!(!desc.is_valid());
        Ok(())
    }

    #[test]
    fn dimensions_accept_width_only_and_width_height() -> Result<(), RequestError> {
        let desc = parse(
            "images/abc!_!h1.jpg",
            &query(&[("d", "400")]),
            "",
            &no_headers(),
        )?;
        assert_eq!(desc.width, Some(400));
        assert_eq!(desc.height, None);

        let desc = parse(
            "images/abc!_!h1.jpg",
            &query(&[("d", "400x300")]),
            "",
            &no_headers(),
        )?;
        assert_eq!(desc.width, Some(400));
        assert_eq!(desc.height, Some(300));
        Ok(())
    }

    #[test]
    fn malformed_dimensions_are_silently_absent() -> Result<(), RequestError> {
        for raw in ["400x300x200", "x300", "wide", "-4", "400x-3"] {
            let desc = parse(
                "images/abc!_!h1.jpg",
                &query(&[("d", raw)]),
                "",
                &no_headers(),
            )?;
            assert_eq!(desc.width, None, "dimensions {raw:?} should be dropped");
            assert_eq!(desc.height, None);
        }
        Ok(())
    }

    #[test]
    fn zero_dimensions_are_treated_as_absent() -> Result<(), RequestError> {
        let desc = parse(
            "images/abc!_!h1.jpg",
            &query(&[("d", "400x0")]),
            "",
            &no_headers(),
        )?;
        assert_eq!(desc.width, Some(400));
        assert_eq!(desc.height, None);
        let resize = desc.resize_spec().expect("width-only resize");
        assert_eq!(resize.fit, crate::model::FitMode::Inside);

        let desc = parse(
            "images/abc!_!h1.jpg",
            &query(&[("d", "0x300")]),
            "",
            &no_headers(),
        )?;
        assert_eq!(desc.width, None);
        assert_eq!(desc.height, None);
        assert!(!desc.needs_resize());
        Ok(())
    }

    #[test]
    fn quality_must_be_all_digits() -> Result<(), RequestError> {
        let desc = parse(
            "images/abc!_!h1.jpg",
            &query(&[("q", "80")]),
            "",
            &no_headers(),
        )?;
        assert_eq!(desc.quality, Some(80));

        for raw in ["80.5", "eighty", "-80", "", "300"] {
            let desc = parse(
                "images/abc!_!h1.jpg",
                &query(&[("q", raw)]),
                "",
                &no_headers(),
            )?;
            assert_eq!(desc.quality, None, "quality {raw:?} should be dropped");
        }
        Ok(())
    }

    #[test]
    fn uppercase_params_are_tried_when_lowercase_is_absent_or_blank() -> Result<(), RequestError> {
        let desc = parse(
            "images/abc!_!h1.jpg",
            &query(&[("D", "400x300"), ("Q", "70")]),
            "",
            &no_headers(),
        )?;
        assert_eq!(desc.width, Some(400));
        assert_eq!(desc.height, Some(300));
        assert_eq!(desc.quality, Some(70));

        let desc = parse(
            "images/abc!_!h1.jpg",
            &query(&[("d", "  "), ("D", "500")]),
            "",
            &no_headers(),
        )?;
        assert_eq!(desc.width, Some(500));

        // The lowercase value wins when both are present.
        let desc = parse(
            "images/abc!_!h1.jpg",
            &query(&[("d", "400"), ("D", "500")]),
            "",
            &no_headers(),
        )?;
        assert_eq!(desc.width, Some(400));
        Ok(())
    }

    #[test]
    fn explicit_format_param_wins_over_webp_negotiation() -> Result<(), RequestError> {
        let mut headers = HashMap::new();
        headers.insert(AUTO_WEBP_HEADER.to_string(), "true".to_string());
        let desc = parse(
            "images/abc!_!h1.jpg",
            &query(&[("f", "PNG")]),
            "image/webp,image/*",
            &headers,
        )?;
        assert_eq!(desc.new_format.as_deref(), Some("png"));
        Ok(())
    }

    #[test]
    fn auto_webp_requires_flag_and_accept_header() -> Result<(), RequestError> {
        let mut headers = HashMap::new();
        headers.insert(AUTO_WEBP_HEADER.to_string(), "true".to_string());

        let desc = parse("images/abc!_!h1.jpg", &query(&[]), "image/webp", &headers)?;
        assert_eq!(desc.new_format.as_deref(), Some("webp"));
        assert!(desc.auto_webp);

        // Flag without browser support keeps the original format.
        let desc = parse("images/abc!_!h1.jpg", &query(&[]), "image/avif", &headers)?;
        assert_eq!(desc.new_format.as_deref(), Some("jpg"));

        // Browser support without the flag keeps the original format.
        let desc = parse(
            "images/abc!_!h1.jpg",
            &query(&[]),
            "image/webp",
            &no_headers(),
        )?;
        assert_eq!(desc.new_format.as_deref(), Some("jpg"));

        // The flag comparison is case-sensitive.
        let mut headers = HashMap::new();
        headers.insert(AUTO_WEBP_HEADER.to_string(), "True".to_string());
        let desc = parse("images/abc!_!h1.jpg", &query(&[]), "image/webp", &headers)?;
        assert!(!desc.auto_webp);
        assert_eq!(desc.new_format.as_deref(), Some("jpg"));
        Ok(())
    }

    #[test]
    fn unsupported_reformat_fails_naming_the_format() {
        let err = parse(
            "images/abc!_!h1.jpg",
            &query(&[("f", "bmp")]),
            "",
            &no_headers(),
        )
        .expect_err("bmp is unsupported");
        assert_eq!(
            err,
            RequestError::UnsupportedFormat {
                format: "bmp".to_string(),
                supported: SUPPORTED_FORMATS,
            }
        );
    }

    #[test]
    fn unsupported_original_format_is_tolerated_without_reformat() -> Result<(), RequestError> {
        let desc = parse("images/abc!_!h1.bmp", &query(&[]), "", &no_headers())?;
        assert!(desc.is_valid());
        assert_eq!(desc.new_format.as_deref(), Some("bmp"));
        assert!(!desc.needs_reformat());
        Ok(())
    }
}
