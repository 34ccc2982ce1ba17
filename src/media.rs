//! Media reference normalization and URL resolution.
//!
//! The CMS hands out image references in several shapes depending on API
//! version, population depth, and whether the snapshot has been through the
//! enrichment step:
//!
//! ```text
//! "/uploads/dawn.jpg"                                   → Bare
//! { "url": "/uploads/dawn.jpg", "width": 1600, ... }    → Flat
//! { "attributes": { "url": "/uploads/dawn.jpg" } }      → Flat
//! { "data": { "attributes": { "url": "..." } } }        → Nested
//! { "url": "...", "responsive": { "srcset": [...] } }   → Enriched
//! ```
//!
//! [`MediaRef::from_value`] is the only place that guesses at shapes. Every
//! other module works with the typed [`MediaRef`].
//!
//! ## URL policy
//!
//! Resolution is driven by an explicit [`MediaPolicy`] rather than ambient
//! environment state, so the same reference and policy always produce the
//! same URL:
//!
//! 1. Absolute URLs (any scheme, or protocol-relative) pass through.
//! 2. Paths already under the static images prefix pass through.
//! 3. **Dev**: the path is served by the CMS, so it is prefixed with the API origin.
//! 4. **Prod**: the file was exported next to the site, so only the filename
//!    is kept and placed under the images prefix.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Which base-URL policy to apply to relative media paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Live CMS: relative upload paths are served by the CMS origin.
    Dev,
    /// Static export: media lives under the site's own images directory.
    #[default]
    Prod,
}

/// Explicit URL policy threaded into every resolution call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPolicy {
    pub mode: Mode,
    /// CMS origin without trailing slash, e.g. `http://localhost:1337`.
    pub api_origin: String,
    /// Root-relative prefix for exported images, without trailing slash.
    pub images_path: String,
}

impl MediaPolicy {
    pub fn new(mode: Mode, api_origin: &str, images_path: &str) -> Self {
        Self {
            mode,
            api_origin: api_origin.trim_end_matches('/').to_string(),
            images_path: images_path.trim_end_matches('/').to_string(),
        }
    }
}

/// A single uploaded file as described by the CMS.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaFile {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub alternative_text: Option<String>,
}

/// One pre-generated width variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub url: String,
    pub width: u32,
    /// Encoded size in bytes.
    #[serde(default)]
    pub size: u64,
}

/// Responsive metadata attached by the enrichment step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Responsive {
    #[serde(default)]
    pub srcset: Vec<Variant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
}

/// A normalized media reference.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaRef {
    Bare(String),
    Flat(MediaFile),
    Nested(MediaFile),
    Enriched {
        file: MediaFile,
        variants: Responsive,
    },
}

impl MediaRef {
    /// Normalize any CMS JSON value into a media reference.
    ///
    /// Returns `None` for every shape that carries no usable URL: `null`,
    /// numbers, arrays, objects without `url`, empty strings.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| MediaRef::Bare(s.to_string()))
            }
            Value::Object(map) => {
                let flat = file_from_object(value)
                    .or_else(|| map.get("attributes").and_then(file_from_object));
                if let Some(file) = flat {
                    let variants = map
                        .get("responsive")
                        .and_then(|r| serde_json::from_value::<Responsive>(r.clone()).ok())
                        .filter(|r| !r.srcset.is_empty());
                    return Some(match variants {
                        Some(variants) => MediaRef::Enriched { file, variants },
                        None => MediaRef::Flat(file),
                    });
                }
                value
                    .pointer("/data/attributes")
                    .and_then(file_from_object)
                    .map(MediaRef::Nested)
            }
            _ => None,
        }
    }

    /// The raw, unresolved URL.
    pub fn url(&self) -> &str {
        match self {
            MediaRef::Bare(url) => url,
            MediaRef::Flat(file) | MediaRef::Nested(file) | MediaRef::Enriched { file, .. } => {
                &file.url
            }
        }
    }

    pub fn file(&self) -> Option<&MediaFile> {
        match self {
            MediaRef::Bare(_) => None,
            MediaRef::Flat(file) | MediaRef::Nested(file) | MediaRef::Enriched { file, .. } => {
                Some(file)
            }
        }
    }

    /// Intrinsic `(width, height)` if the CMS reported both and neither is zero.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let file = self.file()?;
        match (file.width, file.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }

    pub fn alt_text(&self) -> Option<&str> {
        self.file()
            .and_then(|f| f.alternative_text.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn variants(&self) -> Option<&Responsive> {
        match self {
            MediaRef::Enriched { variants, .. } => Some(variants),
            _ => None,
        }
    }

    pub fn resolve(&self, policy: &MediaPolicy) -> Option<String> {
        resolve_url(self.url(), policy)
    }
}

fn file_from_object(value: &Value) -> Option<MediaFile> {
    let url = value.get("url")?.as_str()?.trim();
    if url.is_empty() {
        return None;
    }
    let dim = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    };
    Some(MediaFile {
        url: url.to_string(),
        width: dim("width"),
        height: dim("height"),
        alternative_text: value
            .get("alternativeText")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Resolve an optional reference. Absent references resolve to `None`.
pub fn resolve(media: Option<&MediaRef>, policy: &MediaPolicy) -> Option<String> {
    media.and_then(|m| m.resolve(policy))
}

/// Apply the URL policy to a raw URL string.
pub fn resolve_url(url: &str, policy: &MediaPolicy) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if has_scheme(url) || url.starts_with("//") || is_under(url, &policy.images_path) {
        return Some(url.to_string());
    }
    match policy.mode {
        Mode::Dev => {
            let sep = if url.starts_with('/') { "" } else { "/" };
            Some(format!("{}{}{}", policy.api_origin, sep, url))
        }
        Mode::Prod => {
            let filename = url.rsplit('/').next().unwrap_or(url);
            (!filename.is_empty()).then(|| format!("{}/{}", policy.images_path, filename))
        }
    }
}

/// RFC 3986 scheme check: `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"`.
fn has_scheme(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn is_under(url: &str, prefix: &str) -> bool {
    url == prefix
        || url
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

// =============================================================================
// Serde adapters for lenient fields
// =============================================================================

/// Deserialize an optional media field. Unrecognized shapes become `None`.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<MediaRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(MediaRef::from_value))
}

/// Deserialize a multi-media field.
///
/// Accepts a plain array or the legacy `{ "data": [ { "attributes": … } ] }`
/// wrapper. Entries that carry no URL are dropped.
pub fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<MediaRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let refs = match value {
        Some(Value::Array(items)) => items.iter().filter_map(MediaRef::from_value).collect(),
        Some(Value::Object(map)) => match map.get("data") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| {
                    // Enrichment writes `url` next to `attributes`; it wins.
                    if item.get("url").is_some() {
                        MediaRef::from_value(item)
                    } else {
                        item.get("attributes")
                            .and_then(file_from_object)
                            .map(MediaRef::Nested)
                    }
                })
                .collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    Ok(refs)
}
