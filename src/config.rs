//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a `config.toml` in the project root overrides any subset
//! of them.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [cms]
//! base_url = "http://localhost:1337"  # CMS origin (no trailing slash needed)
//! timeout_secs = 30                   # Per-request timeout
//!
//! [media]
//! mode = "prod"                       # "dev" = CMS-served, "prod" = exported
//! images_path = "/images"             # Where exported images are served
//! optimized_path = "/images/optimized"
//! sizes_hint = "100vw"                # sizes written by `enrich`
//! gallery_sizes_hint = "(min-width: 1024px) 33vw, 50vw"
//!
//! [gallery]
//! container_width = 1000              # Reference width for justified rows
//!
//! [site]
//! lang = "en"
//! groups = ["Ongoing", "Selected Works", "Interactive", "Other Works"]
//!
//! [colors]
//! background = "#ffffff"
//! text = "#111111"
//! text_muted = "#666666"    # Sidebar group labels, captions
//! border = "#e0e0e0"
//! link = "#333333"
//! link_hover = "#000000"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse, so override just the values you want:
//!
//! ```toml
//! [cms]
//! base_url = "https://cms.example.com"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::media::{MediaPolicy, Mode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// CMS connection settings.
    pub cms: CmsConfig,
    /// Media URL policy and responsive hints.
    pub media: MediaConfig,
    /// Justified gallery settings.
    pub gallery: GalleryConfig,
    /// Site-wide metadata and sidebar grouping.
    pub site: SiteSection,
    /// Base color scheme.
    pub colors: ColorScheme,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cms.base_url.starts_with("http://") && !self.cms.base_url.starts_with("https://")
        {
            return Err(ConfigError::Validation(
                "cms.base_url must start with http:// or https://".into(),
            ));
        }
        if self.cms.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "cms.timeout_secs must be greater than 0".into(),
            ));
        }
        for (key, path) in [
            ("media.images_path", &self.media.images_path),
            ("media.optimized_path", &self.media.optimized_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!("{key} must start with '/'")));
            }
        }
        if !(self.gallery.container_width.is_finite() && self.gallery.container_width > 0.0) {
            return Err(ConfigError::Validation(
                "gallery.container_width must be greater than 0".into(),
            ));
        }
        if self.site.groups.is_empty() {
            return Err(ConfigError::Validation(
                "site.groups must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// The media URL policy this config describes.
    pub fn media_policy(&self) -> MediaPolicy {
        MediaPolicy::new(self.media.mode, &self.cms.base_url, &self.media.images_path)
    }
}

/// CMS connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CmsConfig {
    /// CMS origin, e.g. `http://localhost:1337`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1337".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Media URL policy and responsive hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaConfig {
    /// Base-URL policy for relative upload paths.
    pub mode: Mode,
    /// Root-relative directory exported images are served from.
    pub images_path: String,
    /// Root-relative directory optimized variants are served from.
    pub optimized_path: String,
    /// `sizes` value attached to enriched references.
    pub sizes_hint: String,
    /// `sizes` value used for gallery images.
    pub gallery_sizes_hint: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Prod,
            images_path: "/images".to_string(),
            optimized_path: "/images/optimized".to_string(),
            sizes_hint: "100vw".to_string(),
            gallery_sizes_hint: "(min-width: 1024px) 33vw, 50vw".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Reference container width in pixels for justified row computation.
    pub container_width: f64,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            container_width: 1000.0,
        }
    }
}

/// Site-wide metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    /// `lang` attribute of generated pages.
    pub lang: String,
    /// Sidebar group labels, in display order.
    pub groups: Vec<String>,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            groups: ["Ongoing", "Selected Works", "Interactive", "Other Works"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Site color scheme. Pages can override background and text per page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    /// Background color.
    pub background: String,
    /// Primary text color.
    pub text: String,
    /// Muted/secondary text color (sidebar group labels, captions).
    pub text_muted: String,
    /// Border color.
    pub border: String,
    /// Link color.
    pub link: String,
    /// Link hover color.
    pub link_hover: String,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#111111".to_string(),
            text_muted: "#666666".to_string(),
            border: "#e0e0e0".to_string(),
            link: "#333333".to_string(),
            link_hover: "#000000".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Folio Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# CMS
# ---------------------------------------------------------------------------
[cms]
# CMS origin. Overridden by --cms-url or the CMS_BASE_URL environment variable.
base_url = "http://localhost:1337"

# Per-request timeout in seconds.
timeout_secs = 30

# ---------------------------------------------------------------------------
# Media
# ---------------------------------------------------------------------------
[media]
# "prod": relative upload paths are rewritten to images_path/<filename>.
# "dev":  relative upload paths are served by the CMS at base_url.
mode = "prod"

# Where exported images are served from.
images_path = "/images"

# Where optimized width variants are served from.
optimized_path = "/images/optimized"

# sizes attribute attached to images by `folio enrich`.
sizes_hint = "100vw"

# sizes attribute for gallery images.
gallery_sizes_hint = "(min-width: 1024px) 33vw, 50vw"

# ---------------------------------------------------------------------------
# Galleries
# ---------------------------------------------------------------------------
[gallery]
# Reference width in pixels used to compute justified rows.
container_width = 1000.0

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
lang = "en"

# Sidebar groups in display order. Pages in other groups are not listed.
groups = ["Ongoing", "Selected Works", "Interactive", "Other Works"]

# ---------------------------------------------------------------------------
# Colors (pages may override background and text individually)
# ---------------------------------------------------------------------------
[colors]
background = "#ffffff"
text = "#111111"
text_muted = "#666666"    # Sidebar group labels, captions
border = "#e0e0e0"
link = "#333333"
link_hover = "#000000"
"##
}

/// Generate CSS custom properties from the color scheme.
pub fn generate_color_css(colors: &ColorScheme) -> String {
    format!(
        r#":root {{
    --color-bg: {bg};
    --color-text: {text};
    --color-text-muted: {text_muted};
    --color-border: {border};
    --color-link: {link};
    --color-link-hover: {link_hover};
}}"#,
        bg = colors.background,
        text = colors.text,
        text_muted = colors.text_muted,
        border = colors.border,
        link = colors.link,
        link_hover = colors.link_hover,
    )
}
