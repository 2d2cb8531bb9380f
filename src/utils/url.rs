//! URL utilities for platform detection and media address handling

use crate::error::ScanError;
use crate::platform::Platform;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Origin prepended to site-relative player paths
pub const YOUTUBE_ORIGIN: &str = "https://www.youtube.com";

/// Request URLs that count as media files or streaming manifests
const MEDIA_URL_PATTERN: &str = r"\.(m3u8|mpd|mp4|webm|ogg|ts)(\?.*)?$";

fn media_url_regex() -> Option<&'static Regex> {
    static MEDIA_URL: OnceLock<Option<Regex>> = OnceLock::new();
    MEDIA_URL
        .get_or_init(|| Regex::new(MEDIA_URL_PATTERN).ok())
        .as_ref()
}

/// Detect which supported platform a page URL belongs to
pub fn detect_platform(url: &str) -> Result<Platform, ScanError> {
    let parsed = Url::parse(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ScanError::InvalidUrl(format!("missing host in {}", url)))?
        .to_lowercase();
    let host = host
        .trim_start_matches("www.")
        .trim_start_matches("m.")
        .trim_start_matches("web.");

    match host {
        "youtube.com" | "youtu.be" | "music.youtube.com" | "youtube-nocookie.com" => {
            Ok(Platform::YouTube)
        }
        "facebook.com" | "fb.watch" | "fb.com" => Ok(Platform::Facebook),
        "instagram.com" => Ok(Platform::Instagram),
        other => Err(ScanError::UnsupportedPlatform(other.to_string())),
    }
}

/// Check if a URL looks like a media file or streaming manifest
pub fn is_media_url(url: &str) -> bool {
    media_url_regex().map_or(false, |re| re.is_match(url))
}

/// Check if a source is an in-memory blob reference
pub fn is_blob_url(src: &str) -> bool {
    src.starts_with("blob:")
}

/// Resolve a possibly relative `src` against the page URL
pub fn absolutize(base: Option<&Url>, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    match Url::parse(src) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            base.and_then(|b| b.join(src).ok()).map(|u| u.to_string())
        }
        Err(_) => None,
    }
}

/// Turn a player program path from page data into a fetchable URL
pub fn resolve_player_url(path: &str) -> String {
    if path.starts_with("//") {
        format!("https:{}", path)
    } else if path.starts_with('/') {
        format!("{}{}", YOUTUBE_ORIGIN, path)
    } else {
        path.to_string()
    }
}
