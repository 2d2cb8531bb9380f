//! Per-tab stream registry
//!
//! The orchestrator owns one registry; entries are keyed by tab id and
//! live from the first detection until the tab navigates or closes.

use crate::core::stream::{ScanReport, SourceMethod, StreamRecord};
use crate::utils::format::format_bytes;
use crate::utils::url::is_media_url;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Browser tab identifier
pub type TabId = i64;

/// Badge background colour
pub const BADGE_COLOR: &str = "#007bff";

/// Optional metadata accompanying a sighting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamMetadata {
    pub quality: Option<String>,
    pub size_bytes: Option<u64>,
}

impl StreamMetadata {
    pub fn with_quality(quality: impl Into<String>) -> Self {
        Self {
            quality: Some(quality.into()),
            size_bytes: None,
        }
    }

    pub fn with_size(size_bytes: u64) -> Self {
        Self {
            quality: None,
            size_bytes: Some(size_bytes),
        }
    }
}

/// A stream as stored for a tab
#[derive(Debug, Clone, Serialize)]
pub struct DetectedStream {
    #[serde(flatten)]
    pub record: StreamRecord,
    /// Human-readable size, when known
    pub size: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl DetectedStream {
    pub fn address(&self) -> &str {
        &self.record.address
    }
}

/// Badge text and colour for a tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeState {
    pub text: String,
    pub color: &'static str,
}

#[derive(Debug, Default)]
struct TabStreams {
    order: Vec<String>,
    by_address: HashMap<String, DetectedStream>,
}

/// Streams detected per tab, merged across discovery methods
#[derive(Debug, Default)]
pub struct StreamRegistry {
    tabs: HashMap<TabId, TabStreams>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a stream for a tab.
    ///
    /// Later non-empty metadata overwrites earlier values; the source
    /// method keeps the most specific one seen.
    pub fn add_stream(
        &mut self,
        tab: TabId,
        address: &str,
        source: SourceMethod,
        metadata: StreamMetadata,
    ) {
        if address.is_empty() {
            return;
        }

        let now = Utc::now();
        let size = metadata.size_bytes.and_then(format_bytes);
        let incoming = StreamRecord::new(address, metadata.quality.unwrap_or_default(), source);
        let streams = self.tabs.entry(tab).or_default();

        match streams.by_address.get_mut(address) {
            Some(existing) => {
                existing.record.merge(&incoming);
                if size.is_some() {
                    existing.size = size;
                }
                existing.last_updated = now;
                debug!("Updated stream for tab {}: {}", tab, address);
            }
            None => {
                streams.order.push(address.to_string());
                streams.by_address.insert(
                    address.to_string(),
                    DetectedStream {
                        record: incoming,
                        size,
                        first_seen: now,
                        last_updated: now,
                    },
                );
                debug!("New {} stream for tab {}: {}", source, tab, address);
            }
        }
    }

    /// Record a network response if its URL looks like media.
    ///
    /// Returns `true` when the response was recorded.
    pub fn observe_network_response(
        &mut self,
        tab: TabId,
        url: &str,
        content_length: Option<u64>,
    ) -> bool {
        if tab < 0 || !is_media_url(url) {
            return false;
        }
        let metadata = StreamMetadata {
            quality: None,
            size_bytes: content_length,
        };
        self.add_stream(tab, url, SourceMethod::Network, metadata);
        true
    }

    /// Merge the streams of a scan report into a tab
    pub fn merge_report(&mut self, tab: TabId, report: &ScanReport) {
        for record in report.streams() {
            let metadata = if record.quality.is_empty() {
                StreamMetadata::default()
            } else {
                StreamMetadata::with_quality(record.quality.clone())
            };
            self.add_stream(tab, &record.address, record.source_method, metadata);
        }
    }

    /// Streams for a tab in first-detection order
    pub fn streams(&self, tab: TabId) -> Vec<&DetectedStream> {
        self.tabs
            .get(&tab)
            .map(|streams| {
                streams
                    .order
                    .iter()
                    .filter_map(|address| streams.by_address.get(address))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, tab: TabId, address: &str) -> Option<&DetectedStream> {
        self.tabs.get(&tab)?.by_address.get(address)
    }

    pub fn count(&self, tab: TabId) -> usize {
        self.tabs.get(&tab).map_or(0, |s| s.order.len())
    }

    /// Forget a tab's streams (navigation start or user request).
    ///
    /// Returns `false` if the tab had no registry.
    pub fn clear(&mut self, tab: TabId) -> bool {
        match self.tabs.get_mut(&tab) {
            Some(streams) => {
                streams.order.clear();
                streams.by_address.clear();
                true
            }
            None => false,
        }
    }

    /// Drop a closed tab entirely
    pub fn remove_tab(&mut self, tab: TabId) -> bool {
        self.tabs.remove(&tab).is_some()
    }

    /// Badge shown for a tab: the stream count, empty when there are none
    pub fn badge(&self, tab: TabId) -> BadgeState {
        let count = self.count(tab);
        BadgeState {
            text: if count > 0 { count.to_string() } else { String::new() },
            color: BADGE_COLOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_then_deep_scan_merge() {
        let mut registry = StreamRegistry::new();
        assert!(registry.observe_network_response(7, "https://cdn/v/clip.mp4", Some(2048)));

        let mut report = ScanReport::new();
        report.push(StreamRecord::deep_scan("https://cdn/v/clip.mp4", "HD Video"));
        registry.merge_report(7, &report);

        let streams = registry.streams(7);
        assert_eq!(streams.len(), 1);
        let stream = streams[0];
        assert_eq!(stream.address(), "https://cdn/v/clip.mp4");
        assert_eq!(stream.record.quality, "HD Video");
        assert_eq!(stream.record.source_method, SourceMethod::DeepScan);
        assert_eq!(stream.size.as_deref(), Some("2 KB"));
    }

    #[test]
    fn test_less_specific_source_does_not_downgrade() {
        let mut registry = StreamRegistry::new();
        registry.add_stream(
            1,
            "https://x/a.m3u8",
            SourceMethod::DeepScan,
            StreamMetadata::with_quality("720p"),
        );
        registry.add_stream(
            1,
            "https://x/a.m3u8",
            SourceMethod::Network,
            StreamMetadata::with_size(1024 * 1024),
        );

        let stream = registry.get(1, "https://x/a.m3u8").unwrap();
        assert_eq!(stream.record.source_method, SourceMethod::DeepScan);
        assert_eq!(stream.record.quality, "720p");
        assert_eq!(stream.size.as_deref(), Some("1 MB"));
    }

    #[test]
    fn test_non_media_network_responses_ignored() {
        let mut registry = StreamRegistry::new();
        assert!(!registry.observe_network_response(1, "https://x/index.html", None));
        assert!(!registry.observe_network_response(-1, "https://x/a.mp4", None));
        assert_eq!(registry.count(1), 0);
        assert_eq!(registry.count(-1), 0);
    }

    #[test]
    fn test_first_detection_order() {
        let mut registry = StreamRegistry::new();
        for url in ["https://x/3.ts", "https://x/1.ts", "https://x/2.ts"] {
            registry.add_stream(2, url, SourceMethod::Network, StreamMetadata::default());
        }
        registry.add_stream(2, "https://x/1.ts", SourceMethod::PageScan, StreamMetadata::default());

        let addresses: Vec<_> = registry.streams(2).iter().map(|s| s.address()).collect();
        assert_eq!(addresses, vec!["https://x/3.ts", "https://x/1.ts", "https://x/2.ts"]);
    }

    #[test]
    fn test_clear_remove_and_badge() {
        let mut registry = StreamRegistry::new();
        assert!(!registry.clear(3));
        assert_eq!(registry.badge(3).text, "");

        registry.add_stream(3, "https://x/a.mp4", SourceMethod::PageScan, StreamMetadata::default());
        registry.add_stream(3, "https://x/b.mp4", SourceMethod::PageScan, StreamMetadata::default());
        assert_eq!(
            registry.badge(3),
            BadgeState {
                text: "2".to_string(),
                color: BADGE_COLOR
            }
        );

        assert!(registry.clear(3));
        assert_eq!(registry.count(3), 0);
        assert_eq!(registry.badge(3).text, "");

        assert!(registry.remove_tab(3));
        assert!(!registry.remove_tab(3));
    }

    #[test]
    fn test_tabs_are_isolated() {
        let mut registry = StreamRegistry::new();
        registry.add_stream(1, "https://x/a.mp4", SourceMethod::Network, StreamMetadata::default());
        registry.add_stream(2, "https://x/b.mp4", SourceMethod::Network, StreamMetadata::default());
        registry.remove_tab(1);
        assert_eq!(registry.count(1), 0);
        assert_eq!(registry.count(2), 1);
    }

    #[test]
    fn test_empty_address_ignored() {
        let mut registry = StreamRegistry::new();
        registry.add_stream(1, "", SourceMethod::DeepScan, StreamMetadata::default());
        assert_eq!(registry.count(1), 0);
    }
}
