//! Responsive variant selection.
//!
//! Turns a media reference into the `src` / `srcset` / `sizes` triple of an
//! `<img>` element. Only enriched references (static snapshots that went
//! through [`crate::enrich`]) carry width variants; everything else yields a
//! single fixed-resolution source with an empty candidate list.

use crate::media::{MediaPolicy, MediaRef, resolve_url};
use serde::Serialize;

/// Sizes hint used when neither the caller nor the metadata supplies one.
pub const DEFAULT_SIZES: &str = "100vw";

/// A width-tagged alternate source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub url: String,
    pub width: u32,
}

/// The resolved form of an image, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedImage {
    pub primary_src: String,
    pub candidates: Vec<Candidate>,
    pub sizes_hint: Option<String>,
    /// Intrinsic dimensions, when the CMS reported them.
    #[serde(skip)]
    pub dimensions: Option<(u32, u32)>,
    #[serde(skip)]
    pub alt: Option<String>,
}

impl ResolvedImage {
    /// The `srcset` attribute value, or `None` when no variants exist.
    pub fn srcset(&self) -> Option<String> {
        if self.candidates.is_empty() {
            return None;
        }
        Some(
            self.candidates
                .iter()
                .map(|c| format!("{} {}w", c.url, c.width))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

/// Select the responsive sources for a media reference.
///
/// `sizes_hint` overrides the metadata default. The hint is only reported
/// when variants exist, since `sizes` is meaningless without a `srcset`.
pub fn select(
    media: Option<&MediaRef>,
    policy: &MediaPolicy,
    sizes_hint: Option<&str>,
) -> Option<ResolvedImage> {
    let media = media?;
    let primary_src = media.resolve(policy)?;

    let (candidates, sizes) = match media.variants() {
        Some(responsive) => {
            let candidates: Vec<Candidate> = responsive
                .srcset
                .iter()
                .filter_map(|v| {
                    resolve_url(&v.url, policy).map(|url| Candidate {
                        url,
                        width: v.width,
                    })
                })
                .collect();
            let sizes = sizes_hint
                .map(str::to_string)
                .or_else(|| responsive.sizes.clone())
                .unwrap_or_else(|| DEFAULT_SIZES.to_string());
            let sizes = (!candidates.is_empty()).then_some(sizes);
            (candidates, sizes)
        }
        None => (Vec::new(), None),
    };

    Some(ResolvedImage {
        primary_src,
        candidates,
        sizes_hint: sizes,
        dimensions: media.dimensions(),
        alt: media.alt_text().map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Mode;
    use serde_json::json;

    fn prod() -> MediaPolicy {
        MediaPolicy::new(Mode::Prod, "http://localhost:1337", "/images")
    }

    fn enriched() -> MediaRef {
        MediaRef::from_value(&json!({
            "url": "/images/optimized/dawn-original.jpg",
            "width": 3000, "height": 2000,
            "responsive": {
                "srcset": [
                    {"url": "/images/optimized/dawn-640w.jpg", "width": 640, "size": 40000},
                    {"url": "/images/optimized/dawn-1024w.jpg", "width": 1024, "size": 90000}
                ],
                "sizes": "80vw"
            }
        }))
        .unwrap()
    }

    #[test]
    fn missing_reference_selects_nothing() {
        assert_eq!(select(None, &prod(), None), None);
    }

    #[test]
    fn unresolvable_reference_selects_nothing() {
        let m = MediaRef::Bare("/uploads/".into());
        assert_eq!(select(Some(&m), &prod(), None), None);
    }

    #[test]
    fn plain_reference_has_no_candidates() {
        let m = MediaRef::Bare("/uploads/dawn.jpg".into());
        let img = select(Some(&m), &prod(), Some("50vw")).unwrap();
        assert_eq!(img.primary_src, "/images/dawn.jpg");
        assert!(img.candidates.is_empty());
        assert_eq!(img.sizes_hint, None);
        assert_eq!(img.srcset(), None);
    }

    #[test]
    fn enriched_reference_lists_all_variants_in_order() {
        let m = enriched();
        let img = select(Some(&m), &prod(), None).unwrap();
        assert_eq!(img.primary_src, "/images/optimized/dawn-original.jpg");
        assert_eq!(
            img.candidates.iter().map(|c| c.width).collect::<Vec<_>>(),
            vec![640, 1024]
        );
        assert_eq!(img.sizes_hint.as_deref(), Some("80vw"));
        assert_eq!(
            img.srcset().unwrap(),
            "/images/optimized/dawn-640w.jpg 640w, /images/optimized/dawn-1024w.jpg 1024w"
        );
        assert_eq!(img.dimensions, Some((3000, 2000)));
    }

    #[test]
    fn caller_hint_overrides_metadata() {
        let m = enriched();
        let img = select(Some(&m), &prod(), Some("33vw")).unwrap();
        assert_eq!(img.sizes_hint.as_deref(), Some("33vw"));
    }

    #[test]
    fn default_hint_when_metadata_has_none() {
        let m = MediaRef::from_value(&json!({
            "url": "/images/optimized/a-original.jpg",
            "responsive": {"srcset": [{"url": "/images/optimized/a-640w.jpg", "width": 640}]}
        }))
        .unwrap();
        let img = select(Some(&m), &prod(), None).unwrap();
        assert_eq!(img.sizes_hint.as_deref(), Some(DEFAULT_SIZES));
    }
}
