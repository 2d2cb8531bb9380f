//! Page documents and the generic `<video>`/`<source>` page scan

use crate::core::stream::{ScanReport, SourceMethod, StreamRecord};
use crate::error::ScanError;
use crate::utils::url::{absolutize, is_blob_url};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Inline script text with its `type` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    pub kind: Option<String>,
    pub text: String,
}

impl ScriptBlock {
    pub fn is_json_ld(&self) -> bool {
        self.kind
            .as_deref()
            .map_or(false, |k| k.eq_ignore_ascii_case("application/ld+json"))
    }
}

/// An HTML page and the address it was loaded from
#[derive(Debug, Clone)]
pub struct PageDocument {
    url: Option<Url>,
    html: String,
}

impl PageDocument {
    pub fn new(url: Option<Url>, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
        }
    }

    /// Create a document for `url`, validating the address
    pub fn from_url(url: &str, html: impl Into<String>) -> Result<Self, ScanError> {
        Ok(Self::new(Some(Url::parse(url)?), html))
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Absolute form of `src`, resolved against the page URL
    pub fn resolve(&self, src: &str) -> Option<String> {
        absolutize(self.url.as_ref(), src)
    }

    /// Make record addresses absolute; records that can't be resolved are dropped
    pub fn resolve_records(&self, records: Vec<StreamRecord>) -> Vec<StreamRecord> {
        records
            .into_iter()
            .filter_map(|mut record| match self.resolve(&record.address) {
                Some(address) => {
                    record.address = address;
                    Some(record)
                }
                None => {
                    debug!("Dropping unresolvable address {}", record.address);
                    None
                }
            })
            .collect()
    }

    /// Inline script blocks in document order
    pub fn scripts(&self) -> Vec<ScriptBlock> {
        let Ok(selector) = Selector::parse("script") else {
            return Vec::new();
        };
        let document = Html::parse_document(&self.html);
        document
            .select(&selector)
            .map(|el| ScriptBlock {
                kind: el.value().attr("type").map(str::to_string),
                text: el.text().collect::<String>(),
            })
            .filter(|block| !block.text.trim().is_empty())
            .collect()
    }

    /// Values of `attr` on the elements matching `css`, in document order
    pub fn attribute_values(&self, css: &str, attr: &str) -> Result<Vec<String>, ScanError> {
        let selector = Selector::parse(css)
            .map_err(|e| ScanError::ParseFailure(format!("selector {}: {}", css, e)))?;
        let document = Html::parse_document(&self.html);
        Ok(document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(str::to_string)
            .collect())
    }

    /// Absolute, non-blob `src` values of `<video>` elements
    pub fn video_sources(&self) -> Vec<String> {
        self.media_sources("video[src]")
    }

    /// Absolute, non-blob `src` values of the elements matching `css`
    pub fn media_sources(&self, css: &str) -> Vec<String> {
        self.attribute_values(css, "src")
            .unwrap_or_default()
            .into_iter()
            .filter(|src| !is_blob_url(src))
            .filter_map(|src| self.resolve(&src))
            .collect()
    }
}

/// Collect `<video>` addresses and the `<source>` children of videos
pub fn page_scan(page: &PageDocument) -> ScanReport {
    let mut report = ScanReport::new();
    let sources = page.media_sources("video[src], video source[src]");
    let added = report.extend(
        sources
            .into_iter()
            .map(|src| StreamRecord::new(src, "", SourceMethod::PageScan)),
    );
    debug!("Page scan found {} sources", added);
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
<script type="application/ld+json">{"@type":"VideoObject"}</script>
<script>var a = 1;</script>
<script src="/external.js"></script>
</head><body>
<video src="blob:https://example.com/1234"></video>
<video src="/media/clip.mp4"></video>
<video><source src="https://cdn.example.com/hls/master.m3u8" type="application/x-mpegURL"><source src="/media/clip.mp4"></video>
</body></html>"#;

    fn page() -> PageDocument {
        PageDocument::from_url("https://example.com/watch/1", PAGE).unwrap()
    }

    #[test]
    fn test_scripts_skip_empty_blocks() {
        let scripts = page().scripts();
        assert_eq!(scripts.len(), 2);
        assert!(scripts[0].is_json_ld());
        assert_eq!(scripts[1].text, "var a = 1;");
        assert!(!scripts[1].is_json_ld());
    }

    #[test]
    fn test_video_sources_skip_blobs_and_absolutize() {
        assert_eq!(page().video_sources(), vec!["https://example.com/media/clip.mp4"]);
    }

    #[test]
    fn test_page_scan_collects_video_and_source_elements() {
        let report = page_scan(&page());
        let addresses: Vec<_> = report.streams().iter().map(|s| s.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec![
                "https://example.com/media/clip.mp4",
                "https://cdn.example.com/hls/master.m3u8",
            ]
        );
        assert!(report
            .streams()
            .iter()
            .all(|s| s.source_method == SourceMethod::PageScan));
    }

    #[test]
    fn test_page_scan_ignores_audio_and_picture_sources() {
        let page = PageDocument::from_url(
            "https://e.com/post",
            r#"<audio><source src="/a.ogg"></audio><picture><source src="/img.webp"></picture>
<video><source src="/v.webm"></video>"#,
        )
        .unwrap();
        let report = page_scan(&page);
        let addresses: Vec<_> = report.streams().iter().map(|s| s.address.as_str()).collect();
        assert_eq!(addresses, vec!["https://e.com/v.webm"]);
    }

    #[test]
    fn test_relative_sources_without_page_url_are_dropped() {
        let page = PageDocument::new(None, r#"<video src="/a.mp4"></video><video src="https://x/b.mp4"></video>"#);
        assert_eq!(page.video_sources(), vec!["https://x/b.mp4"]);
    }

    #[test]
    fn test_resolve_records() {
        let records = vec![
            StreamRecord::deep_scan("/media/payload.mp4", "HD Video"),
            StreamRecord::deep_scan("https://cdn.example.com/a.mp4", "SD Video"),
        ];
        let resolved = page().resolve_records(records.clone());
        assert_eq!(resolved[0].address, "https://example.com/media/payload.mp4");
        assert_eq!(resolved[0].quality, "HD Video");
        assert_eq!(resolved[1].address, "https://cdn.example.com/a.mp4");

        let anonymous = PageDocument::new(None, "");
        let kept = anonymous.resolve_records(records);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].address, "https://cdn.example.com/a.mp4");
    }

    #[test]
    fn test_invalid_selector() {
        assert!(page().attribute_values("video[", "src").is_err());
    }
}
