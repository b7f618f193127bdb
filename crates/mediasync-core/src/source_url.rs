//! Source URL construction for image downloads.
//!
//! Relative upload paths are resolved against the CMS API base URL. When a
//! descriptor carries resize or format overrides, the URL path is parsed into
//! named segments around the delivery-type segment of an image CDN path:
//!
//! ```text
//! /<cloud>/image/upload/<transformation>/<filename>
//!                ^^^^^^ ^^^^^^^^^^^^^^^^ ^^^^^^^^^^
//!                anchor slot (replaced   last segment
//!                       or inserted)
//! ```
//!
//! URLs that don't have this shape are left untouched.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;
use url::Url;

use crate::types::{ImageDescriptor, ImageTransform};

/// Path segment that anchors the transformation slot.
const DELIVERY_SEGMENT: &str = "upload";

/// Version segment such as `v1571218039`.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^v\d+$").unwrap());

/// Existing transformation such as `w_300,h_200,c_scale`.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static TRANSFORMATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{1,3}_[^,/]+(,[a-z]{1,3}_[^,/]+)*$").unwrap());

/// Build the fully-qualified download URL for an image descriptor.
///
/// A missing `url` resolves to the API base itself; descriptors are not
/// validated.
///
/// ```rust
/// use mediasync_core::{ImageDescriptor, build_image_url};
///
/// let image = ImageDescriptor {
///     url: Some("/uploads/a.png".into()),
///     ..ImageDescriptor::default()
/// };
/// assert_eq!(
///     build_image_url(&image, "http://localhost:1337"),
///     "http://localhost:1337/uploads/a.png"
/// );
/// ```
pub fn build_image_url(image: &ImageDescriptor, api_url: &str) -> String {
    let path = image.url.as_deref().unwrap_or_default();
    let source_url = if is_absolute(path) {
        path.to_string()
    } else {
        join_base(api_url, path)
    };

    let Some(transform) = image.transform.as_ref() else {
        return source_url;
    };
    if !transform.resizes() && transform.format.is_none() {
        return source_url;
    }

    apply_transform(&source_url, transform).unwrap_or_else(|| {
        warn!(url = %source_url, "image URL has no transformation slot; using it unmodified");
        source_url
    })
}

fn is_absolute(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn join_base(api_url: &str, path: &str) -> String {
    match (api_url.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{path}", api_url.trim_end_matches('/')),
        (false, false) if !path.is_empty() && !api_url.is_empty() => format!("{api_url}/{path}"),
        _ => format!("{api_url}{path}"),
    }
}

fn apply_transform(source_url: &str, transform: &ImageTransform) -> Option<String> {
    let mut url = Url::parse(source_url).ok()?;
    let mut segments: Vec<String> = url.path_segments()?.map(ToString::to_string).collect();

    let anchor = segments.iter().position(|s| s == DELIVERY_SEGMENT)?;
    let filename = segments.len() - 1;
    if filename <= anchor || segments[filename].is_empty() {
        return None;
    }

    if transform.resizes() {
        let slot = anchor + 1;
        let spec = transformation_spec(transform);
        if slot < filename && is_replaceable(&segments[slot]) {
            segments[slot] = spec;
        } else {
            segments.insert(slot, spec);
        }
    }

    if let Some(format) = transform.format.as_deref() {
        if let Some(last) = segments.last_mut() {
            *last = replace_extension(last, format);
        }
    }

    url.set_path(&format!("/{}", segments.join("/")));
    Some(url.into())
}

fn is_replaceable(segment: &str) -> bool {
    VERSION_RE.is_match(segment) || TRANSFORMATION_RE.is_match(segment)
}

fn transformation_spec(transform: &ImageTransform) -> String {
    let mut spec = String::new();
    if let Some(width) = transform.width {
        spec.push_str(&format!("w_{width},"));
    }
    if let Some(height) = transform.height {
        spec.push_str(&format!("h_{height},"));
    }
    spec.push_str("c_scale");
    spec
}

fn replace_extension(filename: &str, format: &str) -> String {
    let stem = filename
        .rfind('.')
        .map_or(filename, |dot| &filename[..dot]);
    format!("{stem}.{format}")
}
