//! Headless CMS REST client.
//!
//! The CMS exposes a Strapi-style API under `<base_url>/api`. Listing pages
//! does not populate dynamic-zone media, so every page is fetched again on
//! its own with a deep populate query. Some schema versions reject the deep
//! query; the client then degrades step by step:
//!
//! 1. `populate[0]=image&populate[1]=content.image&populate[2]=content.images`
//! 2. `populate[0]=content&populate[1]=image`
//! 3. the entry as it appeared in the list
//!
//! The [`Cms`] trait separates that fallback logic from HTTP so it can be
//! exercised without a server. [`CmsClient`] is the `ureq` implementation.

use serde_json::{Value, json};
use std::fs;
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use ureq::Agent;

use crate::config::CmsConfig;

const DEEP_POPULATE: &str = "populate[0]=image&populate[1]=content.image&populate[2]=content.images";
const SHALLOW_POPULATE: &str = "populate[0]=content&populate[1]=image";

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("HTTP error: {status} - {body}")]
    Http { status: u16, body: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<ureq::Error> for CmsError {
    fn from(e: ureq::Error) -> Self {
        CmsError::Transport(e.to_string())
    }
}

/// Read access to the CMS.
pub trait Cms {
    /// GET `<base>/api<endpoint>` and parse the body as JSON.
    fn get_json(&self, endpoint: &str) -> Result<Value, CmsError>;

    /// Download a media URL to `dest`. Returns the number of bytes written.
    fn download(&self, url: &str, dest: &Path) -> Result<u64, CmsError>;

    /// All pages, each populated as deeply as the CMS allows.
    ///
    /// Only the list request itself can fail; per-page failures degrade to
    /// shallower data.
    fn fetch_pages(&self) -> Result<Value, CmsError> {
        let list = self.get_json("/pages")?;
        let entries = list
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let detailed: Vec<Value> = entries
            .into_iter()
            .map(|entry| self.fetch_page_detail(entry))
            .collect();

        let mut result = json!({ "data": detailed });
        if let Some(meta) = list.get("meta") {
            result["meta"] = meta.clone();
        }
        Ok(result)
    }

    /// Populate one list entry, falling back to the entry itself.
    fn fetch_page_detail(&self, entry: Value) -> Value {
        let Some(document_id) = entry_document_id(&entry) else {
            tracing::warn!("Page entry has no documentId, using list data");
            return entry;
        };

        for query in [DEEP_POPULATE, SHALLOW_POPULATE] {
            let endpoint = format!("/pages/{document_id}?{query}");
            match self.get_json(&endpoint) {
                Ok(detail) => match detail.get("data") {
                    Some(data) if data.is_object() => return data.clone(),
                    _ => tracing::warn!(document_id, "Page detail response has no data"),
                },
                Err(e) => tracing::warn!(document_id, error = %e, "Page detail fetch failed"),
            }
        }
        tracing::warn!(document_id, "Using list data for page");
        entry
    }

    /// Site settings with the cover image populated.
    fn fetch_site(&self) -> Result<Value, CmsError> {
        self.get_json("/site?populate=image")
    }
}

fn entry_document_id(entry: &Value) -> Option<String> {
    entry
        .get("documentId")
        .or_else(|| entry.pointer("/attributes/documentId"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| entry.get("id").map(|id| id.to_string().trim_matches('"').to_string()))
}

/// Blocking CMS client over `ureq`.
pub struct CmsClient {
    agent: Agent,
    base_url: String,
}

impl CmsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &CmsConfig) -> Self {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api{}", self.base_url, endpoint)
    }

    /// Absolute URL for a media path. Absolute URLs pass through.
    pub fn media_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    fn get(&self, url: &str, accept: &str) -> Result<ureq::Body, CmsError> {
        let response = self.agent.get(url).header("Accept", accept).call()?;

        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            let error_body = body
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_string());
            return Err(CmsError::Http {
                status,
                body: error_body,
            });
        }
        Ok(body)
    }
}

impl Cms for CmsClient {
    fn get_json(&self, endpoint: &str) -> Result<Value, CmsError> {
        let url = self.api_url(endpoint);
        tracing::debug!(%url, "GET");
        let text = self.get(&url, "application/json")?.read_to_string()?;
        Ok(serde_json::from_str(&text)?)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64, CmsError> {
        let url = self.media_url(url);
        tracing::debug!(%url, dest = %dest.display(), "Downloading");
        let body = self.get(&url, "*/*")?;
        Ok(write_atomically(&mut body.into_reader(), dest)?)
    }
}

/// Stream `reader` into `<dest>.part` and rename it over `dest` once
/// complete. On failure the partial file is removed and `dest` is untouched.
pub(crate) fn write_atomically(reader: &mut impl Read, dest: &Path) -> io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let partial = partial_path(dest);
    let result = fs::File::create(&partial)
        .and_then(|mut file| io::copy(reader, &mut file))
        .and_then(|written| fs::rename(&partial, dest).map(|()| written));
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
