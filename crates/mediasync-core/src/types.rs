//! Core data types shared by the traversal engine and the image resolver.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field whose presence marks a JSON object as an image descriptor.
pub const MIME_FIELD: &str = "mime";

/// Field the resolver writes the local file handle into.
pub const LOCAL_FILE_FIELD: &str = "localFile___NODE";

/// Namespace prefix for cache keys.
///
/// Kept identical to the key scheme of the Gatsby source plugin so existing
/// caches stay readable.
pub const CACHE_KEY_PREFIX: &str = "strapi-media-";

/// Stable identifier of an uploaded media item.
///
/// CMS backends hand out numeric ids (SQL) or string ids (document stores);
/// both are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaId {
    /// Numeric id.
    Number(serde_json::Number),
    /// String id.
    Text(String),
}

impl MediaId {
    /// Read an id from a JSON value; anything but a number or string yields `None`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Cache key for this id: `strapi-media-<id>`.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{CACHE_KEY_PREFIX}{self}")
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Upstream modification marker used to decide cache validity.
///
/// Compared by exact JSON value equality: the string `"2020-01-01"` and the
/// number `1577836800` never match each other, and timestamps are not parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionMarker(Value);

impl RevisionMarker {
    /// Wrap a JSON value. Blank values (`null`, `false`, `""`, `0`) are
    /// treated as "no marker".
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let blank = match value {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::String(s) => s.is_empty(),
            Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() < f64::EPSILON),
            Value::Array(_) | Value::Object(_) => false,
        };
        (!blank).then(|| Self(value.clone()))
    }
}

impl From<&str> for RevisionMarker {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl fmt::Display for RevisionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

/// Opaque reference to a materialized local file.
///
/// Minted by the id generator and owned by the node registry; the sync only
/// stores and forwards it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileHandle(String);

impl FileHandle {
    /// Create a handle from any string-like id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the handle is blank (never minted).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileHandle {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Resize and re-encode overrides carried in a descriptor's `__custom` field.
///
/// Only used to build the source URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageTransform {
    /// Target width in pixels.
    pub width: Option<u32>,
    /// Target height in pixels.
    pub height: Option<u32>,
    /// Target file format, without the leading dot (e.g. `webp`).
    pub format: Option<String>,
}

impl ImageTransform {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            width: map.get("width").and_then(dimension),
            height: map.get("height").and_then(dimension),
            format: map
                .get("format")
                .and_then(Value::as_str)
                .filter(|f| !f.is_empty())
                .map(ToString::to_string),
        }
    }

    /// Whether a resize was requested.
    #[must_use]
    pub const fn resizes(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }
}

fn dimension(value: &Value) -> Option<u32> {
    let pixels = match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    pixels.filter(|v| *v > 0)
}

/// Structured view of an image descriptor found in a record.
///
/// Built leniently: every field is optional and nothing is validated, so a
/// descriptor with odd upstream data still goes through the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDescriptor {
    /// Stable media id; the cache key is derived from it.
    pub id: Option<MediaId>,
    /// MIME type that identified the descriptor.
    pub mime: Option<String>,
    /// Source URL, relative to the API base or absolute.
    pub url: Option<String>,
    /// File extension including the dot (e.g. `.png`).
    pub ext: Option<String>,
    /// Display name, used as the local file stem.
    pub name: Option<String>,
    /// Value of `updatedAt`.
    pub updated_at: Option<RevisionMarker>,
    /// Value of `updated_at`, consulted only when `updatedAt` is absent.
    pub updated_at_snake: Option<RevisionMarker>,
    /// Optional transform overrides.
    pub transform: Option<ImageTransform>,
}

impl ImageDescriptor {
    /// Build the structured view from a descriptor object.
    #[must_use]
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let text = |key: &str| map.get(key).and_then(Value::as_str).map(ToString::to_string);
        let marker = |key: &str| map.get(key).and_then(RevisionMarker::from_value);

        Self {
            id: map.get("id").and_then(MediaId::from_value),
            mime: text(MIME_FIELD),
            url: text("url"),
            ext: text("ext"),
            name: text("name"),
            updated_at: marker("updatedAt"),
            updated_at_snake: marker("updated_at"),
            transform: map
                .get("__custom")
                .or_else(|| map.get("custom"))
                .and_then(Value::as_object)
                .map(ImageTransform::from_map),
        }
    }

    /// Current revision marker: `updatedAt`, falling back to `updated_at`.
    #[must_use]
    pub const fn revision(&self) -> Option<&RevisionMarker> {
        match &self.updated_at {
            Some(marker) => Some(marker),
            None => self.updated_at_snake.as_ref(),
        }
    }

    /// Cache key, when the descriptor carries an id.
    #[must_use]
    pub fn cache_key(&self) -> Option<String> {
        self.id.as_ref().map(MediaId::cache_key)
    }
}

/// Persisted association between an image and its materialized file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Handle of the file node created by the last successful download.
    ///
    /// Empty when the stored entry never recorded one.
    #[serde(rename = "fileNodeID", default)]
    pub file_node_id: FileHandle,
    /// Revision marker the file was downloaded at.
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<RevisionMarker>,
}

impl CacheRecord {
    /// Whether this record can be reused for a descriptor at `current`.
    ///
    /// The record must carry a handle, and both markers must be present and
    /// equal.
    #[must_use]
    pub fn is_valid_for(&self, current: Option<&RevisionMarker>) -> bool {
        !self.file_node_id.is_empty()
            && matches!((self.updated_at.as_ref(), current), (Some(stored), Some(current)) if stored == current)
    }
}

/// Outcome of resolving a single image descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A valid cache record was found and its handle touched.
    Reused(FileHandle),
    /// The image was downloaded and the cache record written.
    Downloaded(FileHandle),
    /// The materializer produced no file; nothing was attached or cached.
    Unavailable,
}

impl Resolution {
    /// Handle to attach, if any.
    #[must_use]
    pub const fn handle(&self) -> Option<&FileHandle> {
        match self {
            Self::Reused(handle) | Self::Downloaded(handle) => Some(handle),
            Self::Unavailable => None,
        }
    }
}
