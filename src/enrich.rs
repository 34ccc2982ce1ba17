//! Snapshot enrichment: attach optimized width variants to media references.
//!
//! For every media reference in the snapshot whose source file has a fresh
//! manifest entry, the reference is rewritten in place:
//!
//! ```text
//! { "url": "/uploads/dawn.jpg", "alternativeText": "…" }
//!   ↓
//! { "url": "/images/optimized/dawn-original.jpg", "alternativeText": "…",
//!   "responsive": { "srcset": [ { "url", "width", "size" }, … ], "sizes": "100vw" } }
//! ```
//!
//! Every other field of the reference is preserved. The rewritten reference
//! normalizes to [`MediaRef::Enriched`](crate::media::MediaRef::Enriched).
//!
//! Source files are hashed in parallel before anything is rewritten.
//! An enriched reference points at its optimized original, which is never a
//! manifest key, so running enrichment twice changes nothing.

use crate::cache::{CacheEntry, Freshness, VariantCache, hash_file};
use crate::content::{ContentError, Snapshot, read_snapshot, write_snapshot};
use crate::export::{extract_image_url, url_filename};
use rayon::prelude::*;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Source image extensions the optimizer handles.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Outcome of an enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    /// Source images found in the images directory.
    pub images: usize,
    /// Images with a fresh manifest entry.
    pub fresh: usize,
    /// Images whose manifest entry no longer matches the file.
    pub stale: Vec<String>,
    /// Images the optimizer has not processed.
    pub uncached: Vec<String>,
    /// References rewritten in `pages.json`.
    pub pages_updated: usize,
    /// References rewritten in `site.json`.
    pub site_updated: usize,
}

impl EnrichSummary {
    pub fn updated(&self) -> usize {
        self.pages_updated + self.site_updated
    }
}

impl fmt::Display for EnrichSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} references enriched from {}/{} optimized images",
            self.updated(),
            self.fresh,
            self.images
        )?;
        if !self.stale.is_empty() || !self.uncached.is_empty() {
            write!(
                f,
                " ({} stale, {} not optimized)",
                self.stale.len(),
                self.uncached.len()
            )?;
        }
        Ok(())
    }
}

/// Where enriched references point.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Served path of optimized variants, e.g. `/images/optimized`.
    pub optimized_path: String,
    /// `sizes` value written into each enriched reference.
    pub sizes_hint: String,
}

/// Filename → fresh manifest entry, plus rewrite settings.
pub struct VariantIndex<'a> {
    entries: HashMap<String, &'a CacheEntry>,
    options: &'a EnrichOptions,
}

impl<'a> VariantIndex<'a> {
    pub fn new(entries: HashMap<String, &'a CacheEntry>, options: &'a EnrichOptions) -> Self {
        Self { entries, options }
    }

    /// Rewrite one media value in place. Returns whether it changed.
    pub fn enrich_media(&self, media: &mut Value) -> bool {
        let Some(url) = extract_image_url(media) else {
            return false;
        };
        let Some(filename) = url_filename(&url) else {
            return false;
        };
        let Some(entry) = self.entries.get(filename) else {
            return false;
        };

        let base = self.options.optimized_path.trim_end_matches('/');
        let srcset: Vec<Value> = entry
            .variants(base)
            .into_iter()
            .map(|v| json!({ "url": v.url, "width": v.width, "size": v.size }))
            .collect();

        let mut fields = match media.take() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        fields.insert(
            "url".to_string(),
            Value::String(format!("{base}/{}", entry.original_filename(filename))),
        );
        fields.insert(
            "responsive".to_string(),
            json!({ "srcset": srcset, "sizes": self.options.sizes_hint }),
        );
        *media = Value::Object(fields);
        true
    }

    /// Rewrite covers, image blocks, and gallery images of every page.
    pub fn enrich_pages(&self, pages: &mut Value) -> usize {
        let Some(entries) = pages.get_mut("data").and_then(Value::as_array_mut) else {
            return 0;
        };
        let mut updated = 0;
        for entry in entries {
            let Some(page) = entry_fields(entry) else {
                continue;
            };
            if let Some(image) = page.get_mut("image") {
                updated += usize::from(self.enrich_media(image));
            }
            let Some(blocks) = page.get_mut("content").and_then(Value::as_array_mut) else {
                continue;
            };
            for block in blocks {
                updated += self.enrich_block(block);
            }
        }
        updated
    }

    fn enrich_block(&self, block: &mut Value) -> usize {
        let component = block
            .get("__component")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match component.as_str() {
            "image.image-block" => block
                .get_mut("image")
                .map_or(0, |image| usize::from(self.enrich_media(image))),
            "image.image-gallery" => {
                let items = match block.get_mut("images") {
                    Some(Value::Array(items)) => items,
                    Some(Value::Object(wrapper)) => match wrapper.get_mut("data") {
                        Some(Value::Array(items)) => items,
                        _ => return 0,
                    },
                    _ => return 0,
                };
                items
                    .iter_mut()
                    .map(|item| usize::from(self.enrich_media(item)))
                    .sum()
            }
            _ => 0,
        }
    }

    /// Rewrite the site image.
    pub fn enrich_site(&self, site: &mut Value) -> usize {
        let image = site
            .get_mut("data")
            .and_then(entry_fields)
            .and_then(|fields| fields.get_mut("image"));
        image.map_or(0, |image| usize::from(self.enrich_media(image)))
    }
}

/// The object holding an entry's fields, inside an `attributes` envelope if present.
fn entry_fields(entry: &mut Value) -> Option<&mut Map<String, Value>> {
    let has_envelope = entry.get("attributes").is_some_and(Value::is_object);
    let target = if has_envelope {
        entry.get_mut("attributes")?
    } else {
        entry
    };
    target.as_object_mut()
}

/// Top-level image files in `images_dir`, sorted by name.
pub fn list_images(images_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(images_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_image(p))
        .collect();
    files.sort();
    files
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Hash every source image in parallel: filename → MD5 hex.
pub fn hash_images(images_dir: &Path) -> Result<BTreeMap<String, String>, EnrichError> {
    let files = list_images(images_dir);
    let hashes = files
        .par_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            hash_file(path).map(|hash| (name, hash))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(hashes)
}

/// Enrich an in-memory snapshot. `hashes` maps source filenames to their
/// current content hash.
pub fn enrich_snapshot(
    snapshot: &mut Snapshot,
    cache: &VariantCache,
    hashes: &BTreeMap<String, String>,
    options: &EnrichOptions,
) -> EnrichSummary {
    let mut summary = EnrichSummary {
        images: hashes.len(),
        ..EnrichSummary::default()
    };
    let mut fresh = HashMap::new();
    for (filename, hash) in hashes {
        match cache.check(filename, hash) {
            Freshness::Fresh(entry) => {
                fresh.insert(filename.clone(), entry);
            }
            Freshness::Stale => {
                tracing::warn!(%filename, "Optimized variants are stale, re-run the optimizer");
                summary.stale.push(filename.clone());
            }
            Freshness::Uncached => {
                tracing::debug!(%filename, "No optimized variants");
                summary.uncached.push(filename.clone());
            }
        }
    }
    summary.fresh = fresh.len();

    let index = VariantIndex::new(fresh, options);
    summary.pages_updated = index.enrich_pages(&mut snapshot.pages);
    summary.site_updated = snapshot
        .site
        .as_mut()
        .map_or(0, |site| index.enrich_site(site));
    summary
}

/// Enrich the snapshot in `data_dir` in place.
pub fn run(
    data_dir: &Path,
    images_dir: &Path,
    cache_path: &Path,
    options: &EnrichOptions,
) -> Result<EnrichSummary, EnrichError> {
    let mut snapshot = read_snapshot(data_dir)?;
    let cache = VariantCache::load(cache_path);
    let hashes = hash_images(images_dir)?;
    let summary = enrich_snapshot(&mut snapshot, &cache, &hashes, options);
    if summary.updated() > 0 {
        write_snapshot(data_dir, &snapshot)?;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CACHE_FILENAME, SizeEntry, hash_bytes};
    use crate::content::load_snapshot;
    use crate::media::MediaRef;
    use crate::test_helpers::enrich_options;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn entry_for(bytes: &[u8], stem: &str) -> CacheEntry {
        CacheEntry {
            hash: hash_bytes(bytes),
            sizes: vec![
                SizeEntry {
                    width: 640,
                    filename: format!("{stem}-640w.jpg"),
                    size: 10,
                    original: false,
                },
                SizeEntry {
                    width: 2000,
                    filename: format!("{stem}-original.jpg"),
                    size: 50,
                    original: true,
                },
            ],
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            pages: json!({"data": [
                {"id": 1, "image": {"url": "/uploads/dawn.jpg", "alternativeText": "Dawn"}, "content": [
                    {"__component": "image.image-block", "image": {"url": "/uploads/dusk.jpg"}},
                    {"__component": "image.image-gallery", "images": [
                        {"url": "/uploads/dawn.jpg"}, {"url": "/uploads/other.jpg"}
                    ]},
                    {"__component": "text.text-block", "image": {"url": "/uploads/dawn.jpg"}}
                ]},
                {"id": 2, "attributes": {"image": {"data": {"attributes": {"url": "/uploads/dawn.jpg"}}}}}
            ]}),
            site: Some(json!({"data": {"title": "Site", "image": "/uploads/dusk.jpg"}})),
        }
    }

    fn hashes(pairs: &[(&str, &[u8])]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(name, bytes)| (name.to_string(), hash_bytes(bytes)))
            .collect()
    }

    // =========================================================================
    // Reference rewriting
    // =========================================================================

    #[test]
    fn enriched_reference_keeps_other_fields() {
        let cache: VariantCache = [("dawn.jpg".to_string(), entry_for(b"dawn", "dawn"))]
            .into_iter()
            .collect();
        let mut snap = snapshot();
        enrich_snapshot(&mut snap, &cache, &hashes(&[("dawn.jpg", b"dawn")]), &enrich_options());

        assert_eq!(
            snap.pages["data"][0]["image"],
            json!({
                "url": "/images/optimized/dawn-original.jpg",
                "alternativeText": "Dawn",
                "responsive": {
                    "srcset": [
                        {"url": "/images/optimized/dawn-640w.jpg", "width": 640, "size": 10},
                        {"url": "/images/optimized/dawn-original.jpg", "width": 2000, "size": 50}
                    ],
                    "sizes": "100vw"
                }
            })
        );
        let media = MediaRef::from_value(&snap.pages["data"][0]["image"]).unwrap();
        assert_eq!(media.variants().unwrap().srcset.len(), 2);
        assert_eq!(media.alt_text(), Some("Dawn"));
    }

    #[test]
    fn all_reference_sites_are_covered() {
        let cache: VariantCache = [
            ("dawn.jpg".to_string(), entry_for(b"dawn", "dawn")),
            ("dusk.jpg".to_string(), entry_for(b"dusk", "dusk")),
        ]
        .into_iter()
        .collect();
        let mut snap = snapshot();
        let summary = enrich_snapshot(
            &mut snap,
            &cache,
            &hashes(&[("dawn.jpg", b"dawn"), ("dusk.jpg", b"dusk")]),
            &enrich_options(),
        );

        // cover, image block, one gallery image, wrapped page cover
        assert_eq!(summary.pages_updated, 4);
        assert_eq!(summary.site_updated, 1);
        assert_eq!(
            snap.pages["data"][0]["content"][1]["images"][1]["url"],
            "/uploads/other.jpg"
        );
        // Only image components are touched
        assert_eq!(snap.pages["data"][0]["content"][2]["image"]["url"], "/uploads/dawn.jpg");
        assert_eq!(
            snap.pages["data"][1]["attributes"]["image"]["url"],
            "/images/optimized/dawn-original.jpg"
        );
        assert_eq!(
            snap.site.unwrap()["data"]["image"]["url"],
            "/images/optimized/dusk-original.jpg"
        );
    }

    #[test]
    fn stale_and_uncached_are_reported_not_applied() {
        let cache: VariantCache = [("dawn.jpg".to_string(), entry_for(b"old", "dawn"))]
            .into_iter()
            .collect();
        let mut snap = snapshot();
        let before = snap.clone();
        let summary = enrich_snapshot(
            &mut snap,
            &cache,
            &hashes(&[("dawn.jpg", b"new"), ("dusk.jpg", b"dusk")]),
            &enrich_options(),
        );
        assert_eq!(summary.stale, vec!["dawn.jpg"]);
        assert_eq!(summary.uncached, vec!["dusk.jpg"]);
        assert_eq!(summary.updated(), 0);
        assert_eq!(snap, before);
    }

    #[test]
    fn enrichment_is_idempotent() {
        let cache: VariantCache = [("dawn.jpg".to_string(), entry_for(b"dawn", "dawn"))]
            .into_iter()
            .collect();
        let h = hashes(&[("dawn.jpg", b"dawn")]);
        let mut snap = snapshot();
        enrich_snapshot(&mut snap, &cache, &h, &enrich_options());
        let once = snap.clone();
        let second = enrich_snapshot(&mut snap, &cache, &h, &enrich_options());
        assert_eq!(second.updated(), 0);
        assert_eq!(snap, once);
    }

    #[test]
    fn legacy_gallery_wrapper_is_enriched() {
        let cache: VariantCache = [("g.jpg".to_string(), entry_for(b"g", "g"))]
            .into_iter()
            .collect();
        let mut snap = Snapshot {
            pages: json!({"data": [{"id": 1, "content": [{"__component": "image.image-gallery",
                "images": {"data": [{"id": 5, "attributes": {"url": "/uploads/g.jpg"}}]}}]}]}),
            site: None,
        };
        let summary = enrich_snapshot(&mut snap, &cache, &hashes(&[("g.jpg", b"g")]), &enrich_options());
        assert_eq!(summary.pages_updated, 1);
        let item = &snap.pages["data"][0]["content"][0]["images"]["data"][0];
        assert_eq!(item["url"], "/images/optimized/g-original.jpg");
        assert_eq!(item["id"], 5);
    }

    // =========================================================================
    // Filesystem
    // =========================================================================

    #[test]
    fn list_images_filters_extensions_and_depth() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.JPG"), b"a").unwrap();
        fs::write(tmp.path().join("b.webp"), b"b").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"n").unwrap();
        fs::create_dir(tmp.path().join("optimized")).unwrap();
        fs::write(tmp.path().join("optimized/a-640w.jpg"), b"x").unwrap();

        let names: Vec<String> = list_images(tmp.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.webp"]);
    }

    #[test]
    fn hash_images_of_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(hash_images(&tmp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn run_rewrites_snapshot_on_disk() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        let images = tmp.path().join("images");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("dawn.jpg"), b"dawn").unwrap();
        write_snapshot(&data, &snapshot()).unwrap();

        let cache_path = tmp.path().join(CACHE_FILENAME);
        let cache: VariantCache = [("dawn.jpg".to_string(), entry_for(b"dawn", "dawn"))]
            .into_iter()
            .collect();
        fs::write(&cache_path, serde_json::to_string(&cache).unwrap()).unwrap();

        let summary = run(&data, &images, &cache_path, &enrich_options()).unwrap();
        assert_eq!(summary.images, 1);
        assert_eq!(summary.fresh, 1);
        assert_eq!(summary.pages_updated, 3);
        assert_eq!(
            summary.to_string(),
            "3 references enriched from 1/1 optimized images"
        );

        let content = load_snapshot(&data).unwrap();
        assert!(content.pages[0].image.as_ref().unwrap().variants().is_some());
    }

    #[test]
    fn run_trusts_md5_keyed_optimizer_manifest() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        let images = tmp.path().join("images");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("dawn.jpg"), b"abc").unwrap();
        write_snapshot(&data, &snapshot()).unwrap();

        // As written by the optimizer: `md5sum dawn.jpg`
        let cache_path = tmp.path().join(CACHE_FILENAME);
        fs::write(
            &cache_path,
            r#"{"dawn.jpg": {"hash": "900150983cd24fb0d6963f7d28e17f72", "sizes": [
                {"width": 640, "filename": "dawn-640w.jpg", "size": 10},
                {"width": 2000, "filename": "dawn-original.jpg", "size": 50, "original": true}
            ]}}"#,
        )
        .unwrap();

        let summary = run(&data, &images, &cache_path, &enrich_options()).unwrap();
        assert_eq!(summary.fresh, 1);
        assert!(summary.stale.is_empty());
        assert_eq!(summary.pages_updated, 3);
    }
}
