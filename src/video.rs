//! Video URL classification.
//!
//! Editors paste whatever URL their browser shows. Provider pages cannot be
//! framed, so share links are rewritten to the provider's embeddable player
//! URL. Direct file links play in a native `<video>` element. Anything else
//! is framed as-is on a best-effort basis.
//!
//! Patterns are tried in a fixed order and the first match wins. Provider
//! URLs must never reach the file-extension or generic branches.

use regex::Regex;
use std::sync::LazyLock;

/// Vimeo share URL with an optional privacy hash: `vimeo.com/[video/]<id>[/<hash>]`.
static VIMEO_SHARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.)?vimeo\.com/(?:video/)?(\d+)(?:/([a-f0-9]+))?/?(?:\?.*)?$")
        .unwrap()
});

/// Vimeo player URL, already embeddable.
static VIMEO_PLAYER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://player\.vimeo\.com/video/(\d+)(?:\?.*)?$").unwrap()
});

static YOUTUBE_WATCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.|m\.)?youtube\.com/watch\?(?:.*&)?v=([^&#]+)").unwrap()
});

static YOUTUBE_SHORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://youtu\.be/([^?&#/]+)").unwrap());

/// Direct video file, ignoring any query string.
static VIDEO_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(?:mp4|webm|ogg)(?:\?.*)?$").unwrap());

/// How a video should be embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoKind {
    /// Playable directly in a `<video>` element.
    File,
    /// Framed in an `<iframe>`.
    Embed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSource {
    pub kind: VideoKind,
    pub src: String,
}

impl VideoSource {
    fn embed(src: String) -> Self {
        Self {
            kind: VideoKind::Embed,
            src,
        }
    }
}

/// Classify a raw URL. Empty or whitespace-only input yields `None`.
pub fn normalize(raw: &str) -> Option<VideoSource> {
    let url = raw.trim();
    if url.is_empty() {
        return None;
    }

    if let Some(caps) = VIMEO_SHARE_RE.captures(url) {
        let id = &caps[1];
        let src = match caps.get(2) {
            Some(hash) => format!("https://player.vimeo.com/video/{}?h={}", id, hash.as_str()),
            None => format!("https://player.vimeo.com/video/{}", id),
        };
        return Some(VideoSource::embed(src));
    }

    if let Some(caps) = VIMEO_PLAYER_RE.captures(url) {
        return Some(VideoSource::embed(format!(
            "https://player.vimeo.com/video/{}",
            &caps[1]
        )));
    }

    if let Some(caps) = YOUTUBE_WATCH_RE
        .captures(url)
        .or_else(|| YOUTUBE_SHORT_RE.captures(url))
    {
        return Some(VideoSource::embed(format!(
            "https://www.youtube.com/embed/{}",
            &caps[1]
        )));
    }

    if VIDEO_FILE_RE.is_match(url) {
        return Some(VideoSource {
            kind: VideoKind::File,
            src: url.to_string(),
        });
    }

    Some(VideoSource::embed(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embed(src: &str) -> Option<VideoSource> {
        Some(VideoSource::embed(src.to_string()))
    }

    #[test]
    fn empty_input_is_none() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   \n"), None);
    }

    // =========================================================================
    // Vimeo
    // =========================================================================

    #[test]
    fn vimeo_share_with_privacy_hash() {
        assert_eq!(
            normalize("https://vimeo.com/76979871/abcdef1234"),
            embed("https://player.vimeo.com/video/76979871?h=abcdef1234")
        );
    }

    #[test]
    fn vimeo_share_variants() {
        for url in [
            "https://vimeo.com/76979871",
            "http://www.vimeo.com/76979871",
            "https://vimeo.com/video/76979871",
            "https://vimeo.com/76979871?share=copy",
            "HTTPS://VIMEO.COM/76979871",
        ] {
            assert_eq!(
                normalize(url),
                embed("https://player.vimeo.com/video/76979871"),
                "{url}"
            );
        }
    }

    #[test]
    fn vimeo_player_is_canonicalized() {
        assert_eq!(
            normalize("https://player.vimeo.com/video/123?autoplay=1"),
            embed("https://player.vimeo.com/video/123")
        );
    }

    // =========================================================================
    // YouTube
    // =========================================================================

    #[test]
    fn youtube_watch_drops_extra_params() {
        assert_eq!(
            normalize("https://www.youtube.com/watch?v=abc123&t=5s"),
            embed("https://www.youtube.com/embed/abc123")
        );
    }

    #[test]
    fn youtube_watch_with_leading_params() {
        assert_eq!(
            normalize("https://youtube.com/watch?feature=share&v=xyz"),
            embed("https://www.youtube.com/embed/xyz")
        );
    }

    #[test]
    fn youtube_short_link() {
        assert_eq!(
            normalize("https://youtu.be/dQw4w9WgXcQ?si=tracking"),
            embed("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );
    }

    #[test]
    fn provider_urls_never_become_files() {
        let v = normalize("https://youtu.be/clip.mp4").unwrap();
        assert_eq!(v.kind, VideoKind::Embed);
        assert_eq!(v.src, "https://www.youtube.com/embed/clip.mp4");
    }

    // =========================================================================
    // Files and generic embeds
    // =========================================================================

    #[test]
    fn file_with_query_string() {
        assert_eq!(
            normalize("clip.mp4?token=xyz"),
            Some(VideoSource {
                kind: VideoKind::File,
                src: "clip.mp4?token=xyz".into()
            })
        );
    }

    #[test]
    fn file_extensions_are_case_insensitive() {
        for url in ["/media/a.WEBM", "https://cdn.test/b.Ogg", "c.mp4"] {
            assert_eq!(normalize(url).unwrap().kind, VideoKind::File, "{url}");
        }
    }

    #[test]
    fn unknown_urls_are_generic_embeds() {
        assert_eq!(
            normalize(" https://player.example.com/v/1 "),
            embed("https://player.example.com/v/1")
        );
        assert_eq!(normalize("https://x.test/a.mp4.html").unwrap().kind, VideoKind::Embed);
    }
}
