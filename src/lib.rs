//! # vidscan - media stream discovery for web pages
//!
//! Finds playable media addresses embedded in YouTube, Facebook and
//! Instagram pages.
//!
//! ## Features
//!
//! - Recursive mining of embedded page data for known video fields
//! - YouTube signature deciphering without a script engine
//! - `<video>`/`<source>` page scan
//! - Per-tab stream registry merging network, page and deep-scan sightings
//!
//! ## Example
//!
//! ```rust,no_run
//! use vidscan::{Scanner, StreamRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scanner = Scanner::new().with_timeout(std::time::Duration::from_secs(10));
//!     let page = scanner.load_page("https://www.instagram.com/reel/abc/").await?;
//!
//!     let mut registry = StreamRegistry::new();
//!     scanner.scan_into_registry(&mut registry, 0, &page).await?;
//!     for stream in registry.streams(0) {
//!         println!("{} {}", stream.record.quality, stream.address());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use crate::core::{
    mine, FieldSpecs, GraphMiner, ScanOptions, ScanReport, Scanner, SourceMethod, StreamRecord,
    StreamRegistry,
};
pub use crate::error::ScanError;
pub use crate::platform::{CipherSpec, CipherState, PageDocument, Platform, TransformProgram};

/// Result type alias for vidscan operations
pub type Result<T> = std::result::Result<T, ScanError>;
