//! Content loading.
//!
//! A build reads its content from one of two places:
//!
//! - **Snapshot**: `pages.json` and `site.json` in the data directory, as
//!   written by `folio export` and rewritten by `folio enrich`.
//! - **Live CMS**: in dev mode, pages and site settings are fetched fresh.
//!   If either request fails the build logs a warning and falls back to the
//!   snapshot, so a stopped CMS never blocks local work.

use crate::cms::Cms;
use crate::media::Mode;
use crate::types::{Page, SiteSettings, parse_pages, parse_site};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PAGES_FILE: &str = "pages.json";
pub const SITE_FILE: &str = "site.json";

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Snapshot not found: {0} (run `folio export` first)")]
    MissingSnapshot(PathBuf),
}

/// Where loaded content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cms,
    Snapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub pages: Vec<Page>,
    pub site: Option<SiteSettings>,
    pub origin: Origin,
}

impl Content {
    pub fn from_values(pages: &Value, site: Option<&Value>, origin: Origin) -> Self {
        Self {
            pages: parse_pages(pages),
            site: site.and_then(parse_site),
            origin,
        }
    }
}

/// Raw snapshot documents, before typed parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub pages: Value,
    pub site: Option<Value>,
}

/// Read the snapshot documents from `data_dir`.
///
/// `pages.json` is required; a missing `site.json` means no site settings.
pub fn read_snapshot(data_dir: &Path) -> Result<Snapshot, ContentError> {
    let pages_path = data_dir.join(PAGES_FILE);
    if !pages_path.exists() {
        return Err(ContentError::MissingSnapshot(pages_path));
    }
    let pages = read_json(&pages_path)?;

    let site_path = data_dir.join(SITE_FILE);
    let site = if site_path.exists() {
        Some(read_json(&site_path)?)
    } else {
        None
    };
    Ok(Snapshot { pages, site })
}

/// Write snapshot documents as pretty-printed JSON.
pub fn write_snapshot(data_dir: &Path, snapshot: &Snapshot) -> Result<(), ContentError> {
    fs::create_dir_all(data_dir)?;
    write_json(&data_dir.join(PAGES_FILE), &snapshot.pages)?;
    if let Some(site) = &snapshot.site {
        write_json(&data_dir.join(SITE_FILE), site)?;
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<Value, ContentError> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| ContentError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json(path: &Path, value: &Value) -> Result<(), ContentError> {
    let text = serde_json::to_string_pretty(value).map_err(|source| ContentError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text)?;
    Ok(())
}

/// Load typed content from the static snapshot.
pub fn load_snapshot(data_dir: &Path) -> Result<Content, ContentError> {
    let snapshot = read_snapshot(data_dir)?;
    Ok(Content::from_values(
        &snapshot.pages,
        snapshot.site.as_ref(),
        Origin::Snapshot,
    ))
}

/// Load content for a build.
///
/// In dev mode with a CMS available, try the live CMS first. Prod mode
/// always reads the snapshot.
pub fn load_content(
    data_dir: &Path,
    mode: Mode,
    cms: Option<&dyn Cms>,
) -> Result<Content, ContentError> {
    if let (Mode::Dev, Some(cms)) = (mode, cms) {
        match fetch_live(cms) {
            Ok(content) => return Ok(content),
            Err(e) => {
                tracing::warn!(error = %e, "CMS unavailable, falling back to static snapshot");
            }
        }
    }
    load_snapshot(data_dir)
}

fn fetch_live(cms: &dyn Cms) -> Result<Content, crate::cms::CmsError> {
    let pages = cms.fetch_pages()?;
    let site = cms.fetch_site()?;
    Ok(Content::from_values(&pages, Some(&site), Origin::Cms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::tests::FakeCms;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_fixture(dir: &Path) {
        write_snapshot(
            dir,
            &Snapshot {
                pages: json!({"data": [{"id": 1, "slug": "static-page", "title": "Static"}]}),
                site: Some(json!({"data": {"id": 1, "title": "Static Site"}})),
            },
        )
        .unwrap();
    }

    #[test]
    fn snapshot_loads_pages_and_site() {
        let tmp = TempDir::new().unwrap();
        write_fixture(tmp.path());
        let content = load_snapshot(tmp.path()).unwrap();
        assert_eq!(content.pages.len(), 1);
        assert_eq!(content.site.unwrap().title.as_deref(), Some("Static Site"));
        assert_eq!(content.origin, Origin::Snapshot);
    }

    #[test]
    fn missing_pages_is_error() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            load_snapshot(tmp.path()),
            Err(ContentError::MissingSnapshot(_))
        ));
    }

    #[test]
    fn missing_site_is_none() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(PAGES_FILE), r#"{"data": []}"#).unwrap();
        let content = load_snapshot(tmp.path()).unwrap();
        assert!(content.pages.is_empty());
        assert!(content.site.is_none());
    }

    #[test]
    fn invalid_json_names_the_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(PAGES_FILE), "{not json").unwrap();
        let err = load_snapshot(tmp.path()).unwrap_err();
        assert!(matches!(err, ContentError::Json { .. }));
        assert!(err.to_string().contains(PAGES_FILE));
    }

    #[test]
    fn dev_mode_prefers_live_cms() {
        let tmp = TempDir::new().unwrap();
        write_fixture(tmp.path());
        let cms = FakeCms::default()
            .with("/pages", json!({"data": [{"id": 9, "title": "Live"}]}))
            .with("/site?populate=image", json!({"data": {"title": "Live Site"}}));
        let content = load_content(tmp.path(), Mode::Dev, Some(&cms)).unwrap();
        assert_eq!(content.origin, Origin::Cms);
        assert_eq!(content.pages[0].title.as_deref(), Some("Live"));
        assert_eq!(content.site.unwrap().title.as_deref(), Some("Live Site"));
    }

    #[test]
    fn dev_mode_falls_back_when_cms_fails() {
        let tmp = TempDir::new().unwrap();
        write_fixture(tmp.path());
        // Pages succeed but site settings 404: the whole live load is abandoned.
        let cms = FakeCms::default().with("/pages", json!({"data": []}));
        let content = load_content(tmp.path(), Mode::Dev, Some(&cms)).unwrap();
        assert_eq!(content.origin, Origin::Snapshot);
        assert_eq!(content.pages[0].title.as_deref(), Some("Static"));
    }

    #[test]
    fn prod_mode_never_contacts_cms() {
        let tmp = TempDir::new().unwrap();
        write_fixture(tmp.path());
        let cms = FakeCms::default();
        let content = load_content(tmp.path(), Mode::Prod, Some(&cms)).unwrap();
        assert_eq!(content.origin, Origin::Snapshot);
        assert!(cms.requests.borrow().is_empty());
    }
}
