//! YouTube deep scan: streaming formats from `ytInitialPlayerResponse`

use crate::core::stream::{ScanReport, StreamRecord};
use crate::error::ScanError;
use crate::platform::cipher::{CipherSpec, CipherState};
use crate::platform::client::SourceFetcher;
use crate::platform::page::PageDocument;
use crate::platform::{Platform, PlatformScanner};
use crate::utils::mime::media_kind;
use crate::utils::url::resolve_player_url;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Marker of the script that carries the player response
pub const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    #[serde(rename = "streamingData")]
    streaming_data: Option<Value>,
    #[serde(rename = "playerAds")]
    player_ads: Option<Value>,
}

/// Sections of `streamingData` that list format entries
const FORMAT_SECTIONS: [&str; 2] = ["formats", "adaptiveFormats"];

/// One entry of `formats` / `adaptiveFormats`
#[derive(Debug, Clone, Deserialize)]
pub struct FormatData {
    pub itag: Option<u32>,
    pub url: Option<String>,
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    #[serde(rename = "qualityLabel")]
    pub quality_label: Option<String>,
    pub quality: Option<String>,
    #[serde(rename = "signatureCipher")]
    pub signature_cipher: Option<String>,
    /// Older name of `signatureCipher`
    pub cipher: Option<String>,
}

impl FormatData {
    /// Direct playable address, if the entry has one
    pub fn direct_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    pub fn cipher_text(&self) -> Option<&str> {
        self.signature_cipher
            .as_deref()
            .or(self.cipher.as_deref())
            .filter(|c| !c.is_empty())
    }

    /// Entry needs the decipherment engine
    pub fn is_ciphered(&self) -> bool {
        self.direct_url().is_none() && self.cipher_text().is_some()
    }

    /// Label such as `[VIDEO] 720p60` or `[AUDIO] tiny`
    pub fn display_quality(&self) -> String {
        let label = match (&self.quality_label, self.height) {
            (Some(label), _) if !label.is_empty() => label.clone(),
            (_, Some(height)) => match self.fps {
                Some(fps) => format!("{}p{}", height, fps),
                None => format!("{}p", height),
            },
            _ => self
                .quality
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        };
        format!(
            "[{}] {}",
            media_kind(self.mime_type.as_deref().unwrap_or("")),
            label
        )
    }
}

/// Deep-scan driver for YouTube watch pages
pub struct YouTubeScanner {
    fetcher: Arc<dyn SourceFetcher>,
}

impl YouTubeScanner {
    pub fn new(fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self { fetcher }
    }

    async fn load_cipher(&self, player_url: Option<String>) -> CipherState {
        let player_url = match player_url {
            Some(url) => url,
            None => {
                warn!("Ciphered formats present but no player program URL found");
                return CipherState::fetch_failed(&ScanError::PatternMiss(
                    "player program URL".to_string(),
                ));
            }
        };

        info!("Fetching player program {}", player_url);
        match self.fetcher.fetch_text(&player_url).await {
            Ok(source) => CipherState::from_player_source(&source),
            Err(e) => {
                warn!("Could not fetch player program: {}", e);
                CipherState::fetch_failed(&e)
            }
        }
    }
}

#[async_trait]
impl PlatformScanner for YouTubeScanner {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn scan(&self, page: &PageDocument) -> ScanReport {
        let mut report = ScanReport::new();

        let response = match extract_player_response(page) {
            Ok(Some(response)) => response,
            Ok(None) => {
                debug!("No {} on page", PLAYER_RESPONSE_MARKER);
                return report;
            }
            Err(e) => {
                warn!("Failed to parse player response: {}", e);
                report.note("manifest", e.to_string());
                return report;
            }
        };

        let formats = collect_formats(&response, &mut report);
        if formats.is_empty() {
            return report;
        }

        // One player fetch per page, shared by every ciphered entry
        let cipher = if formats.iter().any(FormatData::is_ciphered) {
            let player_url = player_url(&response, page.html());
            Some(self.load_cipher(player_url).await)
        } else {
            None
        };

        for format in &formats {
            let quality = format.display_quality();
            if let Some(url) = format.direct_url() {
                report.push(StreamRecord::deep_scan(url, quality));
                continue;
            }

            let (Some(text), Some(cipher)) = (format.cipher_text(), cipher.as_ref()) else {
                continue;
            };
            match CipherSpec::parse(text).and_then(|spec| cipher.resolve(&spec)) {
                Ok(address) => {
                    report.push(StreamRecord::deep_scan(address, quality));
                }
                Err(e) => {
                    debug!("Skipping ciphered format {:?}: {}", format.itag, e);
                    report.note("cipher", format!("itag {:?}: {}", format.itag, e));
                }
            }
        }

        info!("YouTube deep scan found {} streams", report.len());
        report
    }
}

fn extract_player_response(page: &PageDocument) -> Result<Option<PlayerResponse>, ScanError> {
    let scripts = page.scripts();
    let Some(script) = scripts
        .iter()
        .find(|s| s.text.contains(PLAYER_RESPONSE_MARKER))
    else {
        return Ok(None);
    };

    let text = &script.text;
    let (start, end) = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(ScanError::ParseFailure(
                "player response script has no object literal".to_string(),
            ))
        }
    };
    Ok(Some(serde_json::from_str(&text[start..=end])?))
}

fn collect_formats(response: &PlayerResponse, report: &mut ScanReport) -> Vec<FormatData> {
    let Some(streaming) = response.streaming_data.as_ref().filter(|v| v.is_object()) else {
        debug!("Player response has no streamingData");
        report.note("manifest", "player response has no streamingData");
        return Vec::new();
    };

    let mut formats = Vec::new();
    for section in FORMAT_SECTIONS {
        let Some(value) = streaming.get(section) else {
            continue;
        };
        let Some(entries) = value.as_array() else {
            debug!("Skipping {}: not a list", section);
            report.note("manifest", format!("{} is not a list", section));
            continue;
        };
        formats.extend(entries.iter().filter_map(|entry| {
            match serde_json::from_value::<FormatData>(entry.clone()) {
                Ok(format) => Some(format),
                Err(e) => {
                    debug!("Skipping malformed {} entry: {}", section, e);
                    None
                }
            }
        }));
    }
    formats
}

/// Player program URL from the ad parameters or the page's `jsUrl` config
fn player_url(response: &PlayerResponse, html: &str) -> Option<String> {
    let from_ads = response.player_ads.as_ref().and_then(|ads| {
        let ads = match ads {
            Value::Array(items) => items.first()?,
            other => other,
        };
        ads.get("playerAdParams")?
            .get("playerJsUrl")?
            .as_str()
            .map(str::to_string)
    });

    let path = from_ads.or_else(|| {
        let js_url = Regex::new(r#""jsUrl"\s*:\s*"([^"]+)""#).ok()?;
        js_url
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().replace("\\/", "/"))
    })?;

    Some(resolve_player_url(&path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const PLAYER_JS: &str = r#"var Rv={rv:function(a){a.reverse()}};
var Nn=function(a){a=a.split("");Rv.rv(a,0);return a.join("")};
x.set("signature",Nn(y.s));"#;

    struct FakeFetcher {
        body: Option<String>,
        calls: AtomicUsize,
        requested: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn serving(body: &str) -> Arc<Self> {
            Arc::new(Self {
                body: Some(body.to_string()),
                calls: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                body: None,
                calls: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SourceFetcher for FakeFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(url.to_string());
            self.body.clone().ok_or(ScanError::HttpStatus(503))
        }
    }

    fn watch_page(response: &Value, extra: &str) -> PageDocument {
        let html = format!(
            "<html><head><script>var ytInitialPlayerResponse = {};</script>{}</head><body></body></html>",
            response, extra
        );
        PageDocument::from_url("https://www.youtube.com/watch?v=abc", html).unwrap()
    }

    fn mixed_response() -> Value {
        json!({
            "streamingData": {
                "formats": [
                    {"itag": 18, "url": "https://rr1.googlevideo.com/videoplayback?itag=18",
                     "mimeType": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"",
                     "qualityLabel": "360p", "height": 360}
                ],
                "adaptiveFormats": [
                    {"itag": 137, "mimeType": "video/mp4; codecs=\"avc1.640028\"",
                     "height": 1080, "fps": 30,
                     "signatureCipher": "s=abcdefgh&sp=sig&url=https%3A%2F%2Frr1.googlevideo.com%2Fvideoplayback%3Fitag%3D137"},
                    {"itag": 140, "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"", "quality": "tiny",
                     "signatureCipher": "s=12345&url=https%3A%2F%2Frr1.googlevideo.com%2Fvideoplayback%3Fitag%3D140"}
                ]
            },
            "playerAds": [
                {"playerAdParams": {"playerJsUrl": "/s/player/abc123/player_ias.vflset/en_US/base.js"}}
            ]
        })
    }

    #[tokio::test]
    async fn test_direct_and_ciphered_formats() {
        let fetcher = FakeFetcher::serving(PLAYER_JS);
        let scanner = YouTubeScanner::new(fetcher.clone());
        let report = scanner.scan(&watch_page(&mixed_response(), "")).await;

        let streams = report.streams();
        assert_eq!(streams.len(), 3);
        assert_eq!(streams[0].address, "https://rr1.googlevideo.com/videoplayback?itag=18");
        assert_eq!(streams[0].quality, "[VIDEO] 360p");
        assert_eq!(
            streams[1].address,
            "https://rr1.googlevideo.com/videoplayback?itag=137&sig=hgfedcba"
        );
        assert_eq!(streams[1].quality, "[VIDEO] 1080p30");
        assert_eq!(
            streams[2].address,
            "https://rr1.googlevideo.com/videoplayback?itag=140&signature=54321"
        );
        assert_eq!(streams[2].quality, "[AUDIO] tiny");

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(
            fetcher.requested.lock().unwrap()[0],
            "https://www.youtube.com/s/player/abc123/player_ias.vflset/en_US/base.js"
        );
    }

    #[tokio::test]
    async fn test_no_fetch_without_ciphered_formats() {
        let fetcher = FakeFetcher::serving(PLAYER_JS);
        let scanner = YouTubeScanner::new(fetcher.clone());
        let response = json!({
            "streamingData": {"formats": [
                {"itag": 22, "url": "https://rr1.googlevideo.com/v?itag=22", "mimeType": "video/mp4", "qualityLabel": "720p"}
            ]}
        });
        let report = scanner.scan(&watch_page(&response, "")).await;

        assert_eq!(report.len(), 1);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_anchor_drops_ciphered_only() {
        let fetcher = FakeFetcher::serving("var nothing=function(){};");
        let scanner = YouTubeScanner::new(fetcher.clone());
        let report = scanner.scan(&watch_page(&mixed_response(), "")).await;

        assert_eq!(report.len(), 1);
        assert_eq!(report.streams()[0].quality, "[VIDEO] 360p");
        assert_eq!(report.issues().len(), 2);
        assert!(report.issues()[0].message.contains("ciphered stream unavailable"));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_player_fetch_failure_keeps_direct_streams() {
        let fetcher = FakeFetcher::failing();
        let scanner = YouTubeScanner::new(fetcher.clone());
        let report = scanner.scan(&watch_page(&mixed_response(), "")).await;

        assert_eq!(report.len(), 1);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_js_url_fallback_and_legacy_cipher() {
        let fetcher = FakeFetcher::serving(PLAYER_JS);
        let scanner = YouTubeScanner::new(fetcher.clone());
        let response = json!({
            "streamingData": {"adaptiveFormats": [
                {"itag": 248, "mimeType": "video/webm", "qualityLabel": "1080p",
                 "cipher": "s=xyz&url=https%3A%2F%2Frr2.googlevideo.com%2Fvideoplayback"}
            ]}
        });
        let config = r#"<script>ytcfg.set({"jsUrl":"\/s\/player\/def456\/base.js"});</script>"#;
        let report = scanner.scan(&watch_page(&response, config)).await;

        assert_eq!(report.len(), 1);
        assert_eq!(
            report.streams()[0].address,
            "https://rr2.googlevideo.com/videoplayback?signature=zyx"
        );
        assert_eq!(
            fetcher.requested.lock().unwrap()[0],
            "https://www.youtube.com/s/player/def456/base.js"
        );
    }

    #[tokio::test]
    async fn test_missing_marker_is_a_no_op() {
        let fetcher = FakeFetcher::serving(PLAYER_JS);
        let scanner = YouTubeScanner::new(fetcher.clone());
        let page = PageDocument::from_url(
            "https://www.youtube.com/watch?v=abc",
            "<html><script>var other = {};</script></html>",
        )
        .unwrap();
        let report = scanner.scan(&page).await;

        assert!(report.is_empty());
        assert!(report.issues().is_empty());
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_player_response() {
        let fetcher = FakeFetcher::serving(PLAYER_JS);
        let scanner = YouTubeScanner::new(fetcher.clone());
        let page = PageDocument::from_url(
            "https://www.youtube.com/watch?v=abc",
            "<html><script>var ytInitialPlayerResponse = {\"streamingData\": {oops};</script></html>",
        )
        .unwrap();
        let report = scanner.scan(&page).await;

        assert!(report.is_empty());
        assert_eq!(report.issues()[0].stage, "manifest");
    }

    #[tokio::test]
    async fn test_partial_manifest_skips_malformed_entries() {
        let fetcher = FakeFetcher::serving(PLAYER_JS);
        let scanner = YouTubeScanner::new(fetcher.clone());
        let response = json!({
            "streamingData": {"formats": [
                {"itag": "not a number", "url": "https://rr1.googlevideo.com/bad"},
                {"itag": 18, "url": "https://rr1.googlevideo.com/good", "mimeType": "video/mp4", "height": 360}
            ]}
        });
        let report = scanner.scan(&watch_page(&response, "")).await;

        assert_eq!(report.len(), 1);
        assert_eq!(report.streams()[0].quality, "[VIDEO] 360p");
    }

    #[tokio::test]
    async fn test_malformed_section_keeps_sibling_section() {
        let fetcher = FakeFetcher::serving(PLAYER_JS);
        let scanner = YouTubeScanner::new(fetcher.clone());
        let response = json!({
            "streamingData": {
                "formats": {"bogus": 1},
                "adaptiveFormats": [
                    {"itag": 251, "url": "https://rr1.googlevideo.com/videoplayback?itag=251",
                     "mimeType": "audio/webm; codecs=\"opus\"", "quality": "tiny"}
                ]
            }
        });
        let report = scanner.scan(&watch_page(&response, "")).await;

        assert_eq!(report.len(), 1);
        assert_eq!(
            report.streams()[0].address,
            "https://rr1.googlevideo.com/videoplayback?itag=251"
        );
        assert_eq!(report.streams()[0].quality, "[AUDIO] tiny");
        assert_eq!(report.issues().len(), 1);
        assert_eq!(report.issues()[0].stage, "manifest");
        assert!(report.issues()[0].message.contains("formats is not a list"));
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn test_display_quality_fallbacks() {
        let format: FormatData = serde_json::from_value(json!({})).unwrap();
        assert_eq!(format.display_quality(), "[MEDIA] unknown");
    }
}
