//! Page model, snapshot normalization, and sidebar grouping.
//!
//! The snapshot files written by `folio export` keep the CMS response shape:
//!
//! ```text
//! pages.json  { "data": [ Page | { "id", "attributes": Page } , ... ] }
//! site.json   { "data": SiteSettings | { "id", "attributes": SiteSettings } }
//! ```
//!
//! Older API versions wrap every entry in an `attributes` envelope;
//! [`normalize_entry`] flattens it before typed parsing. A page that still
//! fails to parse is skipped with a warning so one broken entry never takes
//! the site down.

use crate::blocks::{self, ContentBlock};
use crate::media::{self, MediaRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// CMS entry id. Numeric in most API versions, string in some.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageId {
    Num(i64),
    Text(String),
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageId::Num(n) => write!(f, "{n}"),
            PageId::Text(s) => f.write_str(s),
        }
    }
}

/// A portfolio page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    #[serde(default)]
    pub document_id: Option<String>,
    /// URL slug. Pages without one are not reachable.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Sidebar group label.
    #[serde(default)]
    pub group: Option<String>,
    /// Explicit position within the group.
    #[serde(default)]
    pub order: Option<i64>,
    /// Free-form year range, e.g. `2019–2023`.
    #[serde(default)]
    pub years: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    /// Cover image.
    #[serde(default, deserialize_with = "media::deserialize_opt")]
    pub image: Option<MediaRef>,
    #[serde(default, deserialize_with = "blocks::deserialize_blocks")]
    pub content: Vec<ContentBlock>,
}

impl Page {
    /// Title for display: the title, else the slug, else `Untitled`.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(self.slug.as_deref())
            .unwrap_or("Untitled")
    }

    /// The slug, if non-empty.
    pub fn route_slug(&self) -> Option<&str> {
        self.slug
            .as_deref()
            .map(|s| s.trim_matches('/'))
            .filter(|s| !s.is_empty())
    }
}

/// Site-wide settings: the home page content.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SiteSettings {
    #[serde(default)]
    pub title: Option<String>,
    /// Markdown biography shown on the home page.
    #[serde(default)]
    pub bio: Option<String>,
    /// Fallback cover image.
    #[serde(default, deserialize_with = "media::deserialize_opt")]
    pub image: Option<MediaRef>,
}

// =============================================================================
// Snapshot normalization
// =============================================================================

/// Flatten an `{ id, attributes: {…} }` envelope into one object.
///
/// Fields inside `attributes` win over the outer ones. Entries without an
/// envelope are returned unchanged.
pub fn normalize_entry(entry: Value) -> Value {
    match entry {
        Value::Object(mut outer) => match outer.remove("attributes") {
            Some(Value::Object(attributes)) => {
                let mut flat = serde_json::Map::new();
                if let Some(id) = outer.remove("id") {
                    flat.insert("id".to_string(), id);
                }
                flat.extend(attributes);
                Value::Object(flat)
            }
            Some(other) => {
                outer.insert("attributes".to_string(), other);
                Value::Object(outer)
            }
            None => Value::Object(outer),
        },
        other => other,
    }
}

/// Parse the pages snapshot. Accepts `{ "data": [...] }` or a bare array.
pub fn parse_pages(snapshot: &Value) -> Vec<Page> {
    let entries = match snapshot.get("data").unwrap_or(snapshot) {
        Value::Array(entries) => entries,
        _ => return Vec::new(),
    };
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            match serde_json::from_value::<Page>(normalize_entry(entry.clone())) {
                Ok(page) => Some(page),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping unreadable page entry");
                    None
                }
            }
        })
        .collect()
}

/// Parse the site snapshot. Accepts `{ "data": {...} }` or a bare object.
pub fn parse_site(snapshot: &Value) -> Option<SiteSettings> {
    let entry = snapshot.get("data").unwrap_or(snapshot);
    if !entry.is_object() {
        return None;
    }
    match serde_json::from_value(normalize_entry(entry.clone())) {
        Ok(site) => Some(site),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable site settings");
            None
        }
    }
}

// =============================================================================
// Sidebar grouping
// =============================================================================

/// One sidebar section.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGroup<'a> {
    pub label: &'a str,
    pub pages: Vec<&'a Page>,
}

/// Group routable pages under the configured labels, in label order.
///
/// Within a group, pages with an `order` come first (ascending); the rest
/// follow by case-insensitive title. Empty groups are omitted, as are pages
/// whose group is not configured.
pub fn group_pages<'a>(pages: &'a [Page], labels: &'a [String]) -> Vec<PageGroup<'a>> {
    labels
        .iter()
        .filter_map(|label| {
            let mut members: Vec<&Page> = pages
                .iter()
                .filter(|p| p.group.as_deref() == Some(label.as_str()))
                .filter(|p| p.route_slug().is_some())
                .collect();
            if members.is_empty() {
                return None;
            }
            members.sort_by(|a, b| sidebar_order(a, b));
            Some(PageGroup {
                label: label.as_str(),
                pages: members,
            })
        })
        .collect()
}

fn sidebar_order(a: &Page, b: &Page) -> Ordering {
    match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a
            .display_title()
            .to_lowercase()
            .cmp(&b.display_title().to_lowercase()),
    }
}

/// The cover image for a view: the page's own image, else the site image.
pub fn cover_image<'a>(
    page: Option<&'a Page>,
    site: Option<&'a SiteSettings>,
) -> Option<&'a MediaRef> {
    page.and_then(|p| p.image.as_ref())
        .or_else(|| site.and_then(|s| s.image.as_ref()))
}
