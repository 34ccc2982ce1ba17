//! # Folio
//!
//! A static renderer for a CMS-backed art portfolio. Pages, their content
//! blocks, and the site settings live in a headless CMS; folio turns them
//! into plain HTML with responsive images, justified galleries, embedded
//! video, and a fullscreen lightbox.
//!
//! # Architecture: Snapshot Pipeline
//!
//! The CMS is only needed while content is being edited. A deploy works from
//! files on disk:
//!
//! ```text
//! 1. Export   CMS        →  data/*.json + images/   (content snapshot, originals)
//! 2. (resize) images/    →  images/optimized/       (external optimizer, writes .image-cache.json)
//! 3. Enrich   manifest   →  data/*.json             (attach responsive variants)
//! 4. Build    snapshot   →  dist/                   (final HTML site)
//! ```
//!
//! Each step reads and writes human-readable JSON, so every stage can be
//! inspected or re-run on its own. In dev mode `build` reads the live CMS
//! instead and falls back to the snapshot when the CMS is unreachable.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`media`] | Media reference shapes and URL resolution under dev/prod policy |
//! | [`responsive`] | Picks primary source, `srcset` candidates and `sizes` for an image |
//! | [`rich_text`] | CMS rich-text trees to display trees, including two-column split |
//! | [`blocks`] | Content block model and the dispatcher that renders a page body |
//! | [`video`] | Vimeo/YouTube/file URL normalization |
//! | [`gallery`] | Justified row layout |
//! | [`lightbox`] | Fullscreen viewer contract and navigation state |
//! | [`types`] | Pages, site settings, sidebar grouping |
//! | [`cms`] | Blocking REST client and the `Cms` trait the pipeline depends on |
//! | [`content`] | Snapshot files and the live-or-snapshot content loader |
//! | [`export`] | Snapshot export and image download |
//! | [`cache`] | Optimizer manifest (`.image-cache.json`) with content-hash freshness |
//! | [`enrich`] | Rewrites snapshot media references to their optimized variants |
//! | [`generate`] | Renders the HTML site using Maud |
//! | [`config`] | `config.toml` loading, validation, merging, and CSS generation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Pure Core, Thin Edges
//!
//! Everything from a parsed block to a display node is a pure function of
//! its inputs and a [`media::MediaPolicy`]. Network and filesystem access
//! live in [`cms`], [`content`], [`export`], [`enrich`] and [`generate`]'s
//! `build`. The core never returns errors: a missing image is a placeholder,
//! an unknown block is skipped, a malformed rich-text node is dropped.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time
//! HTML macro system. All interpolation is auto-escaped, which matters here:
//! every string on the page comes from CMS editors.
//!
//! ## Lenient Input
//!
//! The CMS has shipped several response shapes over its versions (flat
//! entries, `{ id, attributes }` envelopes, `{ data: … }` relation wrappers).
//! Every deserializer in this crate accepts all of them and degrades to
//! "absent" rather than failing the page.

pub mod blocks;
pub mod cache;
pub mod cms;
pub mod config;
pub mod content;
pub mod enrich;
pub mod export;
pub mod gallery;
pub mod generate;
pub mod lightbox;
pub mod media;
pub mod output;
pub mod responsive;
pub mod rich_text;
pub mod types;
pub mod video;

#[cfg(test)]
pub(crate) mod test_helpers;
