//! CMS export: snapshot the content and download referenced images.
//!
//! After an export the data directory holds `pages.json` / `site.json` in
//! the CMS response shape and the images directory holds every image those
//! documents reference, flattened to its filename. Production builds read
//! only these files.

use crate::cms::{Cms, CmsError};
use crate::content::{ContentError, Snapshot, write_snapshot};
use crate::types::normalize_entry;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CMS error: {0}")]
    Cms(#[from] CmsError),
    #[error(transparent)]
    Content(#[from] ContentError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    pub pages: usize,
    pub has_site: bool,
    /// Distinct image URLs referenced by the content.
    pub images_found: usize,
    pub downloaded: usize,
    pub bytes: u64,
    /// URLs that could not be downloaded.
    pub failed: Vec<String>,
}

/// Fetch everything from the CMS into `data_dir` and `images_dir`.
///
/// A failed image download is logged and counted, never fatal.
pub fn export(
    cms: &dyn Cms,
    data_dir: &Path,
    images_dir: &Path,
) -> Result<ExportSummary, ExportError> {
    let pages = cms.fetch_pages()?;
    let site = cms.fetch_site()?;
    let snapshot = Snapshot {
        pages,
        site: Some(site),
    };
    write_snapshot(data_dir, &snapshot)?;

    let urls = collect_image_urls(&snapshot.pages, snapshot.site.as_ref());
    std::fs::create_dir_all(images_dir)?;

    let mut summary = ExportSummary {
        pages: snapshot
            .pages
            .get("data")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
        has_site: snapshot
            .site
            .as_ref()
            .and_then(|s| s.get("data"))
            .is_some_and(Value::is_object),
        images_found: urls.len(),
        ..ExportSummary::default()
    };

    for url in urls {
        let Some(filename) = url_filename(&url) else {
            tracing::warn!(%url, "Image URL has no filename, skipping");
            summary.failed.push(url);
            continue;
        };
        match cms.download(&url, &images_dir.join(filename)) {
            Ok(bytes) => {
                summary.downloaded += 1;
                summary.bytes += bytes;
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "Image download failed");
                summary.failed.push(url);
            }
        }
    }
    Ok(summary)
}

/// Extract a downloadable URL from a media value of any CMS shape.
///
/// Falls back to the `medium` then `small` format when the original URL is
/// missing.
pub fn extract_image_url(media: &Value) -> Option<String> {
    let candidates = [
        media.as_str(),
        media.get("url").and_then(Value::as_str),
        media.pointer("/attributes/url").and_then(Value::as_str),
        media.pointer("/data/attributes/url").and_then(Value::as_str),
        media.pointer("/formats/medium/url").and_then(Value::as_str),
        media.pointer("/formats/small/url").and_then(Value::as_str),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|u| !u.is_empty())
        .map(str::to_string)
}

/// Every distinct image URL in the snapshot, in first-seen order.
///
/// Covers page covers, image blocks, gallery images, and the site image.
pub fn collect_image_urls(pages: &Value, site: Option<&Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    let mut push = |media: &Value| {
        if let Some(url) = extract_image_url(media)
            && seen.insert(url.clone())
        {
            urls.push(url);
        }
    };

    let entries = pages
        .get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for entry in entries {
        let page = normalize_entry(entry);
        if let Some(image) = page.get("image") {
            push(image);
        }
        for block in page
            .get("content")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            if let Some(image) = block.get("image") {
                push(image);
            }
            if let Some(images) = block.get("images") {
                for media in gallery_items(images) {
                    push(media);
                }
            }
        }
    }

    if let Some(data) = site.and_then(|s| s.get("data")) {
        let site = normalize_entry(data.clone());
        if let Some(image) = site.get("image") {
            push(image);
        }
    }
    urls
}

fn gallery_items(images: &Value) -> Vec<&Value> {
    match images {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => items.iter().collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Final path segment of a URL, without query or fragment.
pub fn url_filename(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|name| !name.is_empty())
}
