//! Content blocks and the block dispatcher.
//!
//! A page body is an ordered list of dynamic-zone components, discriminated
//! by the CMS `__component` tag:
//!
//! | Tag | Variant |
//! |-----|---------|
//! | `text.text-block` | [`ContentBlock::Text`] |
//! | `text.big-text` | [`ContentBlock::LargeText`] |
//! | `text.two-columns` | [`ContentBlock::TwoColumn`] |
//! | `image.image-block` | [`ContentBlock::Image`] |
//! | `image.image-gallery` | [`ContentBlock::Gallery`] |
//! | `video.video-embed` | [`ContentBlock::Video`] |
//!
//! Anything else, including a known tag with an unreadable payload, parses as
//! [`ContentBlock::Unknown`] and renders to nothing.
//!
//! [`render`] maps blocks to [`DisplayNode`]s in input order. Every known
//! block yields exactly one node: absent data gets an explicit placeholder
//! rather than silence. Two exceptions yield none: unknown blocks, and video
//! blocks whose URL is empty.

use crate::gallery::{self, RowItem};
use crate::lightbox::{Lightbox, LightboxRequest};
use crate::media::{self, MediaPolicy, MediaRef};
use crate::responsive::{ResolvedImage, select};
use crate::rich_text::{self, RichText, TextLayout};
use crate::video::{self, VideoSource};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const DEFAULT_ROWS: usize = 3;
pub const MAX_ROWS: usize = 10;
pub const DEFAULT_GUTTER: u32 = 8;
pub const MAX_GUTTER: u32 = 50;

// =============================================================================
// Input model
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "__component")]
pub enum ContentBlock {
    #[serde(rename = "text.text-block")]
    Text(TextBlock),
    #[serde(rename = "text.big-text")]
    LargeText(TextBlock),
    #[serde(rename = "text.two-columns")]
    TwoColumn(TextBlock),
    #[serde(rename = "image.image-block")]
    Image(ImageBlock),
    #[serde(rename = "image.image-gallery")]
    Gallery(ImageGallery),
    #[serde(rename = "video.video-embed")]
    Video(VideoEmbed),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub text: RichText,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlock {
    #[serde(default, deserialize_with = "media::deserialize_opt")]
    pub image: Option<MediaRef>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub enable_fullscreen: Option<bool>,
}

impl ImageBlock {
    pub fn fullscreen(&self) -> bool {
        self.enable_fullscreen.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GalleryLayout {
    #[default]
    Justify,
    Grid,
    Masonry,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGallery {
    #[serde(default, deserialize_with = "media::deserialize_list")]
    pub images: Vec<MediaRef>,
    #[serde(default)]
    pub layout: Option<GalleryLayout>,
    #[serde(default)]
    pub rows: Option<i64>,
    #[serde(default)]
    pub gutter: Option<i64>,
    #[serde(default)]
    pub enable_fullscreen: Option<bool>,
    #[serde(default)]
    pub caption: Option<String>,
}

impl ImageGallery {
    pub fn layout(&self) -> GalleryLayout {
        self.layout.unwrap_or_default()
    }

    /// Target row count, clamped to `1..=10`.
    pub fn rows(&self) -> usize {
        self.rows
            .map(|r| r.clamp(1, MAX_ROWS as i64) as usize)
            .unwrap_or(DEFAULT_ROWS)
    }

    /// Gutter in pixels, clamped to `0..=50`.
    pub fn gutter(&self) -> u32 {
        self.gutter
            .map(|g| g.clamp(0, MAX_GUTTER as i64) as u32)
            .unwrap_or(DEFAULT_GUTTER)
    }

    pub fn fullscreen(&self) -> bool {
        self.enable_fullscreen.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct VideoEmbed {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

/// Deserialize a dynamic zone. Entries that fail to parse become `Unknown`.
pub fn deserialize_blocks<'de, D>(deserializer: D) -> Result<Vec<ContentBlock>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.into_iter().map(parse_block).collect(),
        _ => Vec::new(),
    })
}

fn parse_block(value: Value) -> ContentBlock {
    let component = value
        .get("__component")
        .and_then(Value::as_str)
        .unwrap_or("<untagged>")
        .to_string();
    serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::debug!(component = %component, error = %e, "Unreadable content block");
        ContentBlock::Unknown
    })
}

// =============================================================================
// Display model
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Body,
    Large,
    TwoColumn,
}

/// A rendered image with its click behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub image: ResolvedImage,
    pub alt: String,
    /// Present when fullscreen viewing is enabled.
    pub lightbox: Option<LightboxRequest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedFigure {
    pub placement: RowItem,
    pub figure: Figure,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GalleryBody {
    /// No displayable images: render the "no images" placeholder.
    Empty,
    Justified {
        container_width: f64,
        rows: Vec<Vec<PlacedFigure>>,
    },
    /// Uniform grid for every non-justify layout.
    Grid { figures: Vec<Figure> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayNode {
    Text {
        style: TextStyle,
        layout: TextLayout,
    },
    /// `figure: None` renders the "no image" placeholder.
    Image {
        figure: Option<Figure>,
        caption: Option<String>,
    },
    Gallery {
        body: GalleryBody,
        gutter: u32,
        caption: Option<String>,
    },
    Video {
        source: VideoSource,
        title: String,
        caption: Option<String>,
    },
}

impl DisplayNode {
    /// All figures in display order.
    pub fn figures(&self) -> Vec<&Figure> {
        match self {
            DisplayNode::Image {
                figure: Some(f), ..
            } => vec![f],
            DisplayNode::Gallery { body, .. } => match body {
                GalleryBody::Empty => Vec::new(),
                GalleryBody::Justified { rows, .. } => {
                    rows.iter().flatten().map(|p| &p.figure).collect()
                }
                GalleryBody::Grid { figures } => figures.iter().collect(),
            },
            _ => Vec::new(),
        }
    }

    /// The image list a lightbox opened from this node would cycle through.
    pub fn lightbox_images(&self) -> Option<&[ResolvedImage]> {
        self.figures()
            .into_iter()
            .find_map(|f| f.lightbox.as_ref())
            .map(|r| r.images.as_slice())
    }

    /// Simulate a click on the figure at `figure_index`.
    ///
    /// Returns `true` if a lightbox was opened.
    pub fn click(&self, figure_index: usize, lightbox: &mut dyn Lightbox) -> bool {
        match self
            .figures()
            .get(figure_index)
            .and_then(|f| f.lightbox.as_ref())
        {
            Some(request) => {
                request.dispatch(lightbox);
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Inputs the dispatcher needs besides the blocks themselves.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub policy: MediaPolicy,
    /// Reference width for justified row computation.
    pub container_width: f64,
    /// `sizes` hint for gallery images.
    pub gallery_sizes: Option<String>,
}

/// Render a page's blocks, preserving order.
pub fn render(blocks: &[ContentBlock], ctx: &RenderContext) -> Vec<DisplayNode> {
    blocks
        .iter()
        .enumerate()
        .filter_map(|(position, block)| render_block(position, block, ctx))
        .collect()
}

fn render_block(position: usize, block: &ContentBlock, ctx: &RenderContext) -> Option<DisplayNode> {
    match block {
        ContentBlock::Text(b) => Some(DisplayNode::Text {
            style: TextStyle::Body,
            layout: TextLayout::Single(rich_text::render(&b.text)),
        }),
        ContentBlock::LargeText(b) => Some(DisplayNode::Text {
            style: TextStyle::Large,
            layout: TextLayout::Single(rich_text::render(&b.text)),
        }),
        ContentBlock::TwoColumn(b) => Some(DisplayNode::Text {
            style: TextStyle::TwoColumn,
            layout: rich_text::render_columns(&b.text),
        }),
        ContentBlock::Image(b) => Some(render_image(b, ctx)),
        ContentBlock::Gallery(g) => Some(render_gallery(g, ctx)),
        ContentBlock::Video(v) => render_video(position, v),
        ContentBlock::Unknown => None,
    }
}

fn render_image(block: &ImageBlock, ctx: &RenderContext) -> DisplayNode {
    let caption = non_empty(block.caption.as_deref());
    let figure = select(block.image.as_ref(), &ctx.policy, None).map(|image| {
        let alt = caption
            .clone()
            .or_else(|| image.alt.clone())
            .unwrap_or_else(|| "Image".to_string());
        let lightbox = block.fullscreen().then(|| LightboxRequest {
            images: vec![image.clone()],
            start_index: 0,
        });
        Figure {
            image,
            alt,
            lightbox,
        }
    });
    DisplayNode::Image { figure, caption }
}

fn render_gallery(block: &ImageGallery, ctx: &RenderContext) -> DisplayNode {
    let gutter = block.gutter();
    let caption = non_empty(block.caption.as_deref());
    let images: Vec<ResolvedImage> = block
        .images
        .iter()
        .filter_map(|m| select(Some(m), &ctx.policy, ctx.gallery_sizes.as_deref()))
        .collect();

    if images.is_empty() {
        return DisplayNode::Gallery {
            body: GalleryBody::Empty,
            gutter,
            caption,
        };
    }

    let fullscreen = block.fullscreen();
    let figures: Vec<Figure> = images
        .iter()
        .enumerate()
        .map(|(i, image)| Figure {
            image: image.clone(),
            alt: image
                .alt
                .clone()
                .unwrap_or_else(|| format!("Image {}", i + 1)),
            lightbox: fullscreen.then(|| LightboxRequest {
                images: images.clone(),
                start_index: i,
            }),
        })
        .collect();

    let body = match block.layout() {
        GalleryLayout::Justify => {
            let aspects: Vec<f64> = figures
                .iter()
                .map(|f| gallery::aspect_ratio(f.image.dimensions))
                .collect();
            let layout = gallery::layout(
                &aspects,
                block.rows(),
                gutter as f64,
                ctx.container_width,
            );
            let mut slots: Vec<Option<Figure>> = figures.into_iter().map(Some).collect();
            let rows = layout
                .into_iter()
                .map(|row| {
                    row.items
                        .into_iter()
                        .filter_map(|placement| {
                            slots[placement.index]
                                .take()
                                .map(|figure| PlacedFigure { placement, figure })
                        })
                        .collect()
                })
                .collect();
            GalleryBody::Justified {
                container_width: ctx.container_width,
                rows,
            }
        }
        GalleryLayout::Grid | GalleryLayout::Masonry | GalleryLayout::Other => {
            GalleryBody::Grid { figures }
        }
    };

    DisplayNode::Gallery {
        body,
        gutter,
        caption,
    }
}

fn render_video(position: usize, block: &VideoEmbed) -> Option<DisplayNode> {
    let source = video::normalize(block.url.as_deref().unwrap_or_default())?;
    let title = non_empty(block.title.as_deref())
        .unwrap_or_else(|| format!("Embedded video {}", position + 1));
    Some(DisplayNode::Video {
        source,
        title,
        caption: non_empty(block.caption.as_deref()),
    })
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
