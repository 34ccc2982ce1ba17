//! HTML site generation.
//!
//! Renders loaded [`Content`] to a static site. Every page's blocks go
//! through the block dispatcher; this module only turns the resulting
//! display nodes into markup.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html          # Sidebar, site cover image, bio
//! ├── dawn-series/
//! │   └── index.html      # One directory per page slug
//! └── images/             # Copy of the exported images directory
//!     └── optimized/
//! ```
//!
//! The exported images directory, optimized variants included, is copied to
//! `dist/<images_path>` so prod URLs like `/images/dawn.jpg` resolve inside
//! the built site.
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/style.css`: Base styles (colors injected from config)
//! - `static/lightbox.js`: Fullscreen viewer for figures marked `data-lightbox`
//!
//! Each page carries its lightbox groups as JSON in
//! `<script id="lightbox-data">`, keyed by the `data-lightbox` group id of
//! the figures that open them.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Templates are type-safe Rust code with automatic XSS escaping.

use crate::blocks::{self, DisplayNode, Figure, GalleryBody, RenderContext, TextStyle};
use crate::config::{self, SiteConfig};
use crate::content::Content;
use crate::media::MediaPolicy;
use crate::responsive::{ResolvedImage, select};
use crate::rich_text::{Inline, TextLayout, TextNode};
use crate::types::{Page, PageGroup, SiteSettings, cover_image, group_pages};
use crate::video::VideoKind;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

const CSS_STATIC: &str = include_str!("../static/style.css");
const LIGHTBOX_JS: &str = include_str!("../static/lightbox.js");

const DEFAULT_SITE_TITLE: &str = "Portfolio";

/// What a page rendered to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageStats {
    pub slug: Option<String>,
    pub title: String,
    pub group: Option<String>,
    /// Blocks in the page body, including unknown ones.
    pub blocks: usize,
    pub nodes: usize,
    pub figures: usize,
    /// Image blocks and galleries rendered as "no image" placeholders.
    pub placeholders: usize,
    pub videos: usize,
}

impl PageStats {
    pub fn dropped(&self) -> usize {
        self.blocks.saturating_sub(self.nodes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildSummary {
    pub output_dir: PathBuf,
    pub pages: Vec<PageStats>,
    /// Page files written (excluding the index).
    pub written: usize,
    /// Titles of pages that have no usable slug.
    pub skipped: Vec<String>,
    /// Image files copied into the output.
    pub images_copied: usize,
}

/// Block dispatcher settings for a site config and URL policy.
pub fn render_context(config: &SiteConfig, policy: &MediaPolicy) -> RenderContext {
    RenderContext {
        policy: policy.clone(),
        container_width: config.gallery.container_width,
        gallery_sizes: Some(config.media.gallery_sizes_hint.clone()),
    }
}

/// Summarize a page's rendered nodes.
pub fn page_stats(page: &Page, nodes: &[DisplayNode]) -> PageStats {
    let mut stats = PageStats {
        slug: page.route_slug().map(str::to_string),
        title: page.display_title().to_string(),
        group: page.group.clone(),
        blocks: page.content.len(),
        nodes: nodes.len(),
        ..PageStats::default()
    };
    for node in nodes {
        stats.figures += node.figures().len();
        match node {
            DisplayNode::Image { figure: None, .. }
            | DisplayNode::Gallery {
                body: GalleryBody::Empty,
                ..
            } => stats.placeholders += 1,
            DisplayNode::Video { .. } => stats.videos += 1,
            _ => {}
        }
    }
    stats
}

/// Shared chrome for every generated document.
struct Layout<'a> {
    lang: &'a str,
    css: &'a str,
    site_title: &'a str,
    groups: &'a [PageGroup<'a>],
    policy: &'a MediaPolicy,
}

/// Render the whole site into `output_dir` and copy `images_dir` beside it.
pub fn build(
    content: &Content,
    config: &SiteConfig,
    policy: &MediaPolicy,
    images_dir: &Path,
    output_dir: &Path,
) -> Result<BuildSummary, GenerateError> {
    let ctx = render_context(config, policy);
    let css = format!(
        "{}\n\n{}",
        config::generate_color_css(&config.colors),
        CSS_STATIC
    );
    let groups = group_pages(&content.pages, &config.site.groups);
    let site_title = content
        .site
        .as_ref()
        .and_then(|s| s.title.as_deref())
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(DEFAULT_SITE_TITLE);
    let layout = Layout {
        lang: &config.site.lang,
        css: &css,
        site_title,
        groups: &groups,
        policy,
    };

    fs::create_dir_all(output_dir)?;
    let images_path = config.media.images_path.trim_matches('/');
    let images_copied = if is_safe_slug(images_path) {
        copy_images(images_dir, &output_dir.join(images_path))?
    } else {
        tracing::warn!(images_path = %config.media.images_path, "Not copying images outside a subdirectory of the output");
        0
    };

    let index = render_index(&layout, content.site.as_ref());
    fs::write(output_dir.join("index.html"), index.into_string())?;

    let mut summary = BuildSummary {
        output_dir: output_dir.to_path_buf(),
        images_copied,
        ..BuildSummary::default()
    };
    for page in &content.pages {
        let nodes = blocks::render(&page.content, &ctx);
        summary.pages.push(page_stats(page, &nodes));

        let Some(slug) = page.route_slug().filter(|s| is_safe_slug(s)) else {
            tracing::warn!(id = %page.id, title = page.display_title(), "Page has no usable slug, skipping");
            summary.skipped.push(page.display_title().to_string());
            continue;
        };
        let html = render_page(&layout, page, content.site.as_ref(), &nodes)?;
        let page_dir = output_dir.join(slug);
        fs::create_dir_all(&page_dir)?;
        fs::write(page_dir.join("index.html"), html.into_string())?;
        summary.written += 1;
    }
    Ok(summary)
}

/// Copy every file under `images_dir` to `dest`, keeping relative paths.
///
/// Partial downloads (`*.part`) are left behind. A missing source directory
/// copies nothing.
fn copy_images(images_dir: &Path, dest: &Path) -> Result<usize, GenerateError> {
    if !images_dir.is_dir() {
        tracing::warn!(dir = %images_dir.display(), "Images directory not found, built pages will link to missing files");
        return Ok(0);
    }
    let mut copied = 0;
    let walker = WalkDir::new(images_dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !e.path().starts_with(dest));
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || entry.file_name().to_string_lossy().ends_with(".part") {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(images_dir) else {
            continue;
        };
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
        copied += 1;
    }
    Ok(copied)
}

fn is_safe_slug(slug: &str) -> bool {
    !slug.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
        && !slug.contains('\\')
}

/// Accept only characters that can appear in a CSS color value.
fn css_color(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| {
        !v.is_empty()
            && v.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '(' | ')' | ',' | '.' | '%' | ' ' | '-'))
    })
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(
    layout: &Layout,
    title: &str,
    current: Option<&str>,
    body_style: Option<String>,
    lightbox_data: Option<String>,
    content: Markup,
) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(layout.lang) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(layout.css)) }
            }
            body style=[body_style] {
                div.site {
                    (render_sidebar(layout.site_title, layout.groups, current))
                    (content)
                }
                @if let Some(data) = lightbox_data {
                    script type="application/json" id="lightbox-data" { (PreEscaped(data)) }
                    script { (PreEscaped(LIGHTBOX_JS)) }
                }
            }
        }
    }
}

/// Renders the grouped page list
pub fn render_sidebar(site_title: &str, groups: &[PageGroup], current: Option<&str>) -> Markup {
    html! {
        nav.sidebar {
            a.site-title href="/" { (site_title) }
            @for group in groups {
                section.sidebar-group {
                    h2 { (group.label) }
                    ul {
                        @for page in &group.pages {
                            @let slug = page.route_slug().unwrap_or_default();
                            li class=[(current == Some(slug)).then_some("current")] {
                                a href={ "/" (slug) "/" } { (page.display_title()) }
                                @if let Some(years) = &page.years {
                                    " "
                                    span.years { (years) }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Renders an `<img>` for a resolved image.
fn render_img(image: &ResolvedImage, alt: &str, class: Option<&str>) -> Markup {
    let (width, height) = image.dimensions.unzip();
    html! {
        img class=[class]
            src=(image.primary_src)
            srcset=[image.srcset()]
            sizes=[image.sizes_hint.as_deref()]
            width=[width]
            height=[height]
            alt=(alt)
            loading="lazy";
    }
}

/// Renders a figure image, wired to its lightbox group when enabled.
fn render_figure_img(figure: &Figure, group: usize) -> Markup {
    let (width, height) = figure.image.dimensions.unzip();
    match &figure.lightbox {
        Some(request) => html! {
            img.lightbox-trigger
                src=(figure.image.primary_src)
                srcset=[figure.image.srcset()]
                sizes=[figure.image.sizes_hint.as_deref()]
                width=[width]
                height=[height]
                alt=(figure.alt)
                loading="lazy"
                tabindex="0"
                data-lightbox=(group)
                data-lightbox-index=(request.start_index);
        },
        None => render_img(&figure.image, &figure.alt, None),
    }
}

fn render_inlines(inlines: &[Inline]) -> Markup {
    html! {
        @for inline in inlines {
            @match inline {
                Inline::Text(text) => (text),
                Inline::Bold(c) => strong { (render_inlines(c)) },
                Inline::Italic(c) => em { (render_inlines(c)) },
                Inline::Underline(c) => u { (render_inlines(c)) },
                Inline::Strikethrough(c) => s { (render_inlines(c)) },
                Inline::Code(c) => code { (render_inlines(c)) },
                Inline::Link { href, children } => {
                    a href=(href) target="_blank" rel="noopener noreferrer" { (render_inlines(children)) }
                }
            }
        }
    }
}

fn render_text_nodes(nodes: &[TextNode]) -> Markup {
    html! {
        @for node in nodes {
            @match node {
                TextNode::Paragraph(c) => p { (render_inlines(c)) },
                TextNode::Heading { level, children } => {
                    @match *level {
                        1 => h1 { (render_inlines(children)) },
                        2 => h2 { (render_inlines(children)) },
                        3 => h3 { (render_inlines(children)) },
                        4 => h4 { (render_inlines(children)) },
                        5 => h5 { (render_inlines(children)) },
                        _ => h6 { (render_inlines(children)) },
                    }
                }
                TextNode::List { ordered: true, items } => ol {
                    @for item in items { li { (render_inlines(item)) } }
                },
                TextNode::List { ordered: false, items } => ul {
                    @for item in items { li { (render_inlines(item)) } }
                },
                TextNode::Rule => { hr; }
            }
        }
    }
}

fn caption(text: Option<&String>) -> Markup {
    html! {
        @if let Some(text) = text {
            figcaption { (text) }
        }
    }
}

/// Renders one display node. `position` doubles as the lightbox group id.
pub fn render_node(node: &DisplayNode, position: usize) -> Markup {
    match node {
        DisplayNode::Text { style, layout } => {
            let class = match style {
                TextStyle::Body => "text-block",
                TextStyle::Large => "text-block text-large",
                TextStyle::TwoColumn => "text-block text-two-column",
            };
            html! {
                section class=(class) {
                    @match layout {
                        TextLayout::Single(nodes) => (render_text_nodes(nodes)),
                        TextLayout::Columns { left, right } => {
                            div.column { (render_text_nodes(left)) }
                            div.column { (render_text_nodes(right)) }
                        }
                    }
                }
            }
        }
        DisplayNode::Image { figure, caption: cap } => html! {
            figure.image-block {
                @match figure {
                    Some(figure) => (render_figure_img(figure, position)),
                    None => div.image-placeholder { "No image" },
                }
                (caption(cap.as_ref()))
            }
        },
        DisplayNode::Gallery {
            body,
            gutter,
            caption: cap,
        } => {
            let gap = format!("--gutter: {gutter}px");
            html! {
                figure.gallery style=(gap) {
                    @match body {
                        GalleryBody::Empty => div.gallery-empty { "No images in this gallery" },
                        GalleryBody::Justified { rows, .. } => {
                            @for row in rows {
                                div.gallery-row {
                                    @for placed in row {
                                        div.gallery-item style=(format!(
                                            "flex: {:.4} 1 0; aspect-ratio: {:.4}",
                                            placed.placement.width, placed.placement.aspect_ratio
                                        )) {
                                            (render_figure_img(&placed.figure, position))
                                        }
                                    }
                                }
                            }
                        }
                        GalleryBody::Grid { figures } => div.gallery-grid {
                            @for figure in figures {
                                div.gallery-item { (render_figure_img(figure, position)) }
                            }
                        },
                    }
                    (caption(cap.as_ref()))
                }
            }
        }
        DisplayNode::Video {
            source,
            title,
            caption: cap,
        } => html! {
            figure.video-embed {
                @match source.kind {
                    VideoKind::File => video controls preload="metadata" src=(source.src) title=(title) {},
                    VideoKind::Embed => div.video-frame {
                        iframe src=(source.src) title=(title) loading="lazy"
                            allow="autoplay; fullscreen; picture-in-picture" allowfullscreen {}
                    },
                }
                (caption(cap.as_ref()))
            }
        },
    }
}

// ============================================================================
// Lightbox data
// ============================================================================

#[derive(Serialize)]
struct Slide<'a> {
    src: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    srcset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sizes: Option<&'a str>,
    alt: &'a str,
}

/// JSON for every lightbox group on a page, or `None` if there are none.
pub fn lightbox_data(nodes: &[DisplayNode]) -> Result<Option<String>, GenerateError> {
    let groups: BTreeMap<usize, Vec<Slide>> = nodes
        .iter()
        .enumerate()
        .filter_map(|(position, node)| {
            node.lightbox_images().map(|images| {
                let slides = images
                    .iter()
                    .map(|image| Slide {
                        src: &image.primary_src,
                        srcset: image.srcset(),
                        sizes: image.sizes_hint.as_deref(),
                        alt: image.alt.as_deref().unwrap_or_default(),
                    })
                    .collect();
                (position, slides)
            })
        })
        .collect();
    if groups.is_empty() {
        return Ok(None);
    }
    // Keep `</script>` in alt text from closing the data element.
    Ok(Some(serde_json::to_string(&groups)?.replace("</", "<\\/")))
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders the home page: cover image, title, and markdown bio
fn render_index(layout: &Layout, site: Option<&SiteSettings>) -> Markup {
    let cover = select(cover_image(None, site), layout.policy, None);
    let bio_html = site.and_then(|s| s.bio.as_deref()).map(|bio| {
        let mut out = String::new();
        md_html::push_html(&mut out, Parser::new(bio));
        out
    });

    let content = html! {
        main.home {
            @if let Some(cover) = &cover {
                (render_img(cover, layout.site_title, Some("cover-image")))
            }
            h1 { (layout.site_title) }
            @if let Some(bio) = bio_html {
                div.bio { (PreEscaped(bio)) }
            }
        }
    };
    base_document(layout, layout.site_title, None, None, None, content)
}

/// Renders one portfolio page
fn render_page(
    layout: &Layout,
    page: &Page,
    site: Option<&SiteSettings>,
    nodes: &[DisplayNode],
) -> Result<Markup, GenerateError> {
    let cover = select(cover_image(Some(page), site), layout.policy, None);
    let title = page.display_title();

    let mut vars = Vec::new();
    if let Some(bg) = css_color(page.background_color.as_deref()) {
        vars.push(format!("--page-bg: {bg}"));
    }
    if let Some(fg) = css_color(page.text_color.as_deref()) {
        vars.push(format!("--page-text: {fg}"));
    }
    let body_style = (!vars.is_empty()).then(|| vars.join("; "));

    let content = html! {
        main.page {
            @if let Some(cover) = &cover {
                (render_img(cover, title, Some("cover-image")))
            }
            header.page-header {
                h1 { (title) }
                @if let Some(subtitle) = &page.subtitle {
                    p.subtitle { (subtitle) }
                }
                @if let Some(years) = &page.years {
                    p.years { (years) }
                }
            }
            @for (position, node) in nodes.iter().enumerate() {
                (render_node(node, position))
            }
        }
    };
    let page_title = format!("{} · {}", title, layout.site_title);
    Ok(base_document(
        layout,
        &page_title,
        page.route_slug(),
        body_style,
        lightbox_data(nodes)?,
        content,
    ))
}

// ============================================================================
// Tests
// ============================================================================
