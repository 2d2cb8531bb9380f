//! Instagram deep scan: `__additionalDataLoaded` payloads and JSON-LD

use crate::core::miner::{FieldSpecs, GraphMiner, ListField};
use crate::core::stream::{ScanReport, StreamRecord};
use crate::error::ScanError;
use crate::platform::page::{PageDocument, ScriptBlock};
use crate::platform::{Platform, PlatformScanner};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Prefix of the script that carries post data
pub const ADDITIONAL_DATA_PREFIX: &str = "window.__additionalDataLoaded";

/// Deep-scan driver for Instagram posts and reels
#[derive(Debug, Clone)]
pub struct InstagramScanner {
    miner: GraphMiner,
    specs: FieldSpecs,
}

impl InstagramScanner {
    pub fn new() -> Self {
        Self {
            miner: GraphMiner::new(),
            specs: FieldSpecs::new()
                .scalar("video_url", "HD Video")
                .list_field(ListField::new("video_versions")),
        }
    }

    pub fn with_miner(mut self, miner: GraphMiner) -> Self {
        self.miner = miner;
        self
    }

    fn scan_sync(&self, page: &PageDocument) -> ScanReport {
        let mut report = ScanReport::new();
        let scripts = page.scripts();

        match additional_data(&scripts) {
            Ok(Some(graph)) => {
                let outcome = self.miner.mine_report(&graph, &self.specs);
                if outcome.truncated_branches > 0 {
                    report.note(
                        "miner",
                        format!(
                            "{} ({} branches skipped)",
                            ScanError::DepthExceeded(self.miner.max_depth()),
                            outcome.truncated_branches
                        ),
                    );
                }
                report.extend(page.resolve_records(outcome.records));
            }
            Ok(None) => debug!("No {} script", ADDITIONAL_DATA_PREFIX),
            Err(e) => {
                warn!("Failed to parse additional data: {}", e);
                report.note("additional data", e.to_string());
            }
        }

        match json_ld_content_url(&scripts) {
            Ok(Some(url)) => match page.resolve(&url) {
                Some(address) => {
                    report.push(StreamRecord::deep_scan(address, "JSON-LD Source"));
                }
                None => debug!("Dropping unresolvable JSON-LD address {}", url),
            },
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to parse JSON-LD: {}", e);
                report.note("json-ld", e.to_string());
            }
        }

        info!("Instagram deep scan found {} streams", report.len());
        report
    }
}

impl Default for InstagramScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformScanner for InstagramScanner {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn scan(&self, page: &PageDocument) -> ScanReport {
        self.scan_sync(page)
    }
}

fn additional_data(scripts: &[ScriptBlock]) -> Result<Option<Value>, ScanError> {
    let Some(script) = scripts
        .iter()
        .find(|s| s.text.trim_start().starts_with(ADDITIONAL_DATA_PREFIX))
    else {
        return Ok(None);
    };

    let object = Regex::new(r"(?s)(\{.+\})\s*\)?\s*;")?;
    let json = object
        .captures(&script.text)
        .and_then(|c| c.get(1))
        .ok_or_else(|| ScanError::PatternMiss("object literal in additional data".to_string()))?;
    Ok(Some(serde_json::from_str(json.as_str())?))
}

fn json_ld_content_url(scripts: &[ScriptBlock]) -> Result<Option<String>, ScanError> {
    let Some(script) = scripts.iter().find(|s| s.is_json_ld()) else {
        return Ok(None);
    };

    let data: Value = serde_json::from_str(script.text.trim())?;
    Ok(data
        .get("video")
        .and_then(|v| v.get("contentUrl"))
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> PageDocument {
        PageDocument::from_url("https://www.instagram.com/reel/abc/", body).unwrap()
    }

    #[tokio::test]
    async fn test_additional_data_and_json_ld() {
        let html = r#"<html><head>
<script type="application/ld+json">{"@type":"VideoObject","video":{"contentUrl":"https://scontent.cdninstagram.com/ld.mp4"}}</script>
</head><body>
<script>window.__additionalDataLoaded('/reel/abc/',{"items":[{"video_url":"https://scontent.cdninstagram.com/hd.mp4","video_versions":[{"url":"https://scontent.cdninstagram.com/640.mp4","width":640,"height":1136},{"url":"https://scontent.cdninstagram.com/hd.mp4","width":720,"height":1280}]}]});</script>
</body></html>"#;
        let report = InstagramScanner::new().scan(&page(html)).await;

        let found: Vec<_> = report
            .streams()
            .iter()
            .map(|s| (s.address.as_str(), s.quality.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("https://scontent.cdninstagram.com/hd.mp4", "HD Video"),
                ("https://scontent.cdninstagram.com/640.mp4", "640x1136"),
                ("https://scontent.cdninstagram.com/ld.mp4", "JSON-LD Source"),
            ]
        );
    }

    #[tokio::test]
    async fn test_json_ld_duplicate_is_skipped() {
        let html = r#"<script type="application/ld+json">{"video":{"contentUrl":"https://ig/v.mp4"}}</script>
<script>window.__additionalDataLoaded('x',{"video_url":"https://ig/v.mp4"});</script>"#;
        let report = InstagramScanner::new().scan(&page(html)).await;
        assert_eq!(report.len(), 1);
        assert_eq!(report.streams()[0].quality, "HD Video");
    }

    #[tokio::test]
    async fn test_malformed_blocks_are_noted() {
        let html = r#"<script type="application/ld+json">{not json</script>
<script>window.__additionalDataLoaded('x',{broken});</script>"#;
        let report = InstagramScanner::new().scan(&page(html)).await;

        assert!(report.is_empty());
        let stages: Vec<_> = report.issues().iter().map(|i| i.stage.as_str()).collect();
        assert_eq!(stages, vec!["additional data", "json-ld"]);
    }

    #[tokio::test]
    async fn test_relative_payload_addresses_are_resolved() {
        let html = r#"<script type="application/ld+json">{"video":{"contentUrl":"/media/ld.mp4"}}</script>
<script>window.__additionalDataLoaded('x',{"video_url":"//scontent.cdninstagram.com/hd.mp4"});</script>"#;
        let report = InstagramScanner::new().scan(&page(html)).await;

        let addresses: Vec<_> = report.streams().iter().map(|s| s.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec![
                "https://scontent.cdninstagram.com/hd.mp4",
                "https://www.instagram.com/media/ld.mp4",
            ]
        );
    }

    #[tokio::test]
    async fn test_no_markers() {
        let report = InstagramScanner::new()
            .scan(&page("<html><script>console.log(1)</script></html>"))
            .await;
        assert!(report.is_empty());
        assert!(report.issues().is_empty());
    }
}
