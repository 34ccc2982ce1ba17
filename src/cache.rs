//! Variant manifest written by the image optimizer.
//!
//! The optimizer resizes every file in the images directory to a set of
//! widths and records what it produced in `.image-cache.json`, keyed by
//! source filename:
//!
//! ```json
//! {
//!   "dawn.jpg": {
//!     "hash": "<md5 of images/dawn.jpg>",
//!     "sizes": [
//!       { "width": 640,  "filename": "dawn-640w.jpg",      "size": 41230 },
//!       { "width": 1024, "filename": "dawn-1024w.jpg",     "size": 90211 },
//!       { "width": 3000, "filename": "dawn-original.jpg",  "size": 801122, "original": true }
//!     ]
//!   }
//! }
//! ```
//!
//! An entry is only trusted while its `hash` matches the current source
//! file. Content hashes rather than mtimes, so the check survives a fresh
//! checkout. A mismatch means the source changed after the optimizer ran and
//! the recorded variants are stale.

use crate::media::Variant;
use serde::{Deserialize, Serialize};
use md5::{Digest, Md5};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Default manifest filename in the project root.
pub const CACHE_FILENAME: &str = ".image-cache.json";

/// One generated width variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeEntry {
    pub width: u32,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    /// Full-resolution re-encode of the source.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub original: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    #[serde(default)]
    pub sizes: Vec<SizeEntry>,
}

impl CacheEntry {
    /// Filename of the full-resolution variant.
    ///
    /// Uses the entry flagged `original`, else the optimizer's naming
    /// convention `<stem>-original<ext>`.
    pub fn original_filename(&self, source: &str) -> String {
        self.sizes
            .iter()
            .find(|s| s.original)
            .map(|s| s.filename.clone())
            .unwrap_or_else(|| {
                let (stem, ext) = split_extension(source);
                format!("{stem}-original{ext}")
            })
    }

    /// All variants as served URLs under `optimized_path`, in manifest order.
    pub fn variants(&self, optimized_path: &str) -> Vec<Variant> {
        let base = optimized_path.trim_end_matches('/');
        self.sizes
            .iter()
            .map(|s| Variant {
                url: format!("{base}/{}", s.filename),
                width: s.width,
                size: s.size,
            })
            .collect()
    }
}

/// Whether a source file's recorded variants can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness<'a> {
    Fresh(&'a CacheEntry),
    /// Recorded, but the source changed since.
    Stale,
    /// Never optimized.
    Uncached,
}

/// The optimizer manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl VariantCache {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the manifest. Returns an empty cache if the file doesn't exist
    /// or can't be parsed.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str(&content) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable variant manifest");
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, filename: &str) -> Option<&CacheEntry> {
        self.entries.get(filename)
    }

    /// Check a source file against its recorded hash.
    pub fn check(&self, filename: &str, current_hash: &str) -> Freshness<'_> {
        match self.entries.get(filename) {
            Some(entry) if entry.hash == current_hash => Freshness::Fresh(entry),
            Some(_) => Freshness::Stale,
            None => Freshness::Uncached,
        }
    }
}

impl FromIterator<(String, CacheEntry)> for VariantCache {
    fn from_iter<I: IntoIterator<Item = (String, CacheEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// MD5 hash of a file's contents as lowercase hex, the digest the optimizer
/// records.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

/// Split `name.ext` into `("name", ".ext")`. Dotfiles have no extension.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(i) if i > 0 => filename.split_at(i),
        _ => (filename, ""),
    }
}
