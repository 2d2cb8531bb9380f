//! Stream records and scan reports

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// How a stream address was discovered.
///
/// Variants are ordered from least to most specific; merging keeps the
/// most specific method seen for an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceMethod {
    /// Sniffed from network response headers
    Network,
    /// Found in `<video>`/`<source>` elements of the page
    PageScan,
    /// Mined from embedded page data by a platform scanner
    DeepScan,
}

impl SourceMethod {
    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            SourceMethod::Network => "Network",
            SourceMethod::PageScan => "Page",
            SourceMethod::DeepScan => "Deep Scan",
        }
    }
}

impl fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A playable media address with its quality label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Absolute media URI, the record's identity
    pub address: String,
    /// Quality label (e.g. "HD Video", "1280x720", "[VIDEO] 720p"); may be empty
    pub quality: String,
    /// Discovery method
    pub source_method: SourceMethod,
}

impl StreamRecord {
    /// Create a new record
    pub fn new(
        address: impl Into<String>,
        quality: impl Into<String>,
        source_method: SourceMethod,
    ) -> Self {
        Self {
            address: address.into(),
            quality: quality.into(),
            source_method,
        }
    }

    /// Create a record found by a platform deep scan
    pub fn deep_scan(address: impl Into<String>, quality: impl Into<String>) -> Self {
        Self::new(address, quality, SourceMethod::DeepScan)
    }

    /// Merge a later sighting of the same address into this record.
    ///
    /// Non-empty fields of `other` overwrite, the source method keeps the
    /// most specific value.
    pub fn merge(&mut self, other: &StreamRecord) {
        debug_assert_eq!(self.address, other.address);
        if !other.quality.is_empty() {
            self.quality = other.quality.clone();
        }
        self.source_method = self.source_method.max(other.source_method);
    }
}

/// Something that went wrong during a scan without aborting it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanIssue {
    /// Stage or marker the issue belongs to
    pub stage: String,
    /// Human-readable message
    pub message: String,
}

/// Result of one scan invocation: the streams found plus recovered issues
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    streams: Vec<StreamRecord>,
    issues: Vec<ScanIssue>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl ScanReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stream unless its address was already reported.
    ///
    /// Returns `true` if the stream was added.
    pub fn push(&mut self, record: StreamRecord) -> bool {
        if record.address.is_empty() || self.seen.contains(&record.address) {
            return false;
        }
        self.seen.insert(record.address.clone());
        self.streams.push(record);
        true
    }

    /// Add every stream, skipping already reported addresses
    pub fn extend(&mut self, records: impl IntoIterator<Item = StreamRecord>) -> usize {
        let mut added = 0;
        for record in records {
            if self.push(record) {
                added += 1;
            }
        }
        added
    }

    /// Check whether an address was already reported
    pub fn contains(&self, address: &str) -> bool {
        self.seen.contains(address)
    }

    /// Record a recovered issue
    pub fn note(&mut self, stage: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ScanIssue {
            stage: stage.into(),
            message: message.into(),
        });
    }

    /// Streams in discovery order
    pub fn streams(&self) -> &[StreamRecord] {
        &self.streams
    }

    /// Recovered issues in occurrence order
    pub fn issues(&self) -> &[ScanIssue] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }
}
