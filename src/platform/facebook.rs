//! Facebook deep scan: `playable_url` fields in embedded JSON

use crate::core::miner::{FieldSpecs, GraphMiner};
use crate::core::stream::{ScanReport, StreamRecord};
use crate::error::ScanError;
use crate::platform::page::PageDocument;
use crate::platform::{Platform, PlatformScanner};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

/// Substring that marks a script worth parsing
pub const PLAYABLE_MARKER: &str = "playable_url";

/// Deep-scan driver for Facebook video pages
#[derive(Debug, Clone)]
pub struct FacebookScanner {
    miner: GraphMiner,
    specs: FieldSpecs,
}

impl FacebookScanner {
    pub fn new() -> Self {
        Self {
            miner: GraphMiner::new(),
            specs: FieldSpecs::new()
                .scalar("playable_url", "SD Video")
                .scalar("playable_url_quality_hd", "HD Video"),
        }
    }

    pub fn with_miner(mut self, miner: GraphMiner) -> Self {
        self.miner = miner;
        self
    }

    fn scan_sync(&self, page: &PageDocument) -> ScanReport {
        let mut report = ScanReport::new();

        let blocks = page
            .scripts()
            .into_iter()
            .filter(|s| s.text.contains(PLAYABLE_MARKER));
        for (index, block) in blocks.enumerate() {
            let graph: Value = match serde_json::from_str(block.text.trim()) {
                Ok(graph) => graph,
                Err(e) => {
                    // Plenty of scripts mention the key without being JSON
                    debug!("Script block {} is not JSON: {}", index, e);
                    continue;
                }
            };

            let outcome = self.miner.mine_report(&graph, &self.specs);
            if outcome.truncated_branches > 0 {
                report.note(
                    "miner",
                    format!(
                        "script block {}: {} ({} branches skipped)",
                        index,
                        ScanError::DepthExceeded(self.miner.max_depth()),
                        outcome.truncated_branches
                    ),
                );
            }
            report.extend(page.resolve_records(outcome.records));
        }

        for src in page.video_sources() {
            if !report.contains(&src) {
                report.push(StreamRecord::deep_scan(src, "Direct Source"));
            }
        }

        info!("Facebook deep scan found {} streams", report.len());
        report
    }
}

impl Default for FacebookScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformScanner for FacebookScanner {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn scan(&self, page: &PageDocument) -> ScanReport {
        self.scan_sync(page)
    }
}
