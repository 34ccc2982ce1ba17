//! Shared test utilities for the folio test suite.
//!
//! Builders for the structures most tests need: parsed blocks from inline
//! JSON, a production render context, and minimal pages.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let parsed = blocks(json!([{"__component": "image.image-block", "image": "/a.jpg"}]));
//! let nodes = crate::blocks::render(&parsed, &render_ctx());
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::blocks::{self, ContentBlock, RenderContext};
use crate::enrich::EnrichOptions;
use crate::media::{MediaPolicy, Mode};
use crate::responsive::ResolvedImage;
use crate::types::{Page, PageId};

// =========================================================================
// Builders
// =========================================================================

/// A plain resolved image with no variants, alt text, or dimensions.
pub fn resolved(src: &str) -> ResolvedImage {
    ResolvedImage {
        primary_src: src.to_string(),
        candidates: Vec::new(),
        sizes_hint: None,
        dimensions: None,
        alt: None,
    }
}

#[derive(Deserialize)]
struct Body {
    #[serde(deserialize_with = "blocks::deserialize_blocks")]
    content: Vec<ContentBlock>,
}

/// Parse a JSON array of blocks the way page bodies are parsed.
pub fn blocks(value: Value) -> Vec<ContentBlock> {
    let body: Body = serde_json::from_value(serde_json::json!({ "content": value })).unwrap();
    body.content
}

/// Production render context with stock settings.
pub fn render_ctx() -> RenderContext {
    RenderContext {
        policy: MediaPolicy::new(Mode::Prod, "http://localhost:1337", "/images"),
        container_width: 1000.0,
        gallery_sizes: Some("(min-width: 1024px) 33vw, 50vw".to_string()),
    }
}

/// A page titled by its slug, in `group`, with no body.
pub fn page(slug: &str, group: &str, order: Option<i64>) -> Page {
    Page {
        id: PageId::Text(slug.to_string()),
        document_id: None,
        slug: Some(slug.to_string()),
        title: Some(slug.to_string()),
        subtitle: None,
        group: Some(group.to_string()),
        order,
        years: None,
        background_color: None,
        text_color: None,
        image: None,
        content: Vec::new(),
    }
}

pub fn enrich_options() -> EnrichOptions {
    EnrichOptions {
        optimized_path: "/images/optimized".to_string(),
        sizes_hint: "100vw".to_string(),
    }
}
