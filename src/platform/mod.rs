//! Platform drivers that dig stream addresses out of page data

pub mod cipher;
pub mod client;
pub mod facebook;
pub mod instagram;
pub mod page;
pub mod youtube;

pub use cipher::*;
pub use client::*;
pub use facebook::FacebookScanner;
pub use instagram::InstagramScanner;
pub use page::*;
pub use youtube::YouTubeScanner;

use crate::core::stream::ScanReport;
use crate::error::ScanError;
use async_trait::async_trait;
use clap::ValueEnum;
use std::fmt;
use std::str::FromStr;

/// Platforms with a dedicated deep-scan driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Platform {
    #[value(name = "youtube")]
    YouTube,
    Facebook,
    Instagram,
}

impl Platform {
    pub fn all() -> [Platform; 3] {
        [Platform::YouTube, Platform::Facebook, Platform::Instagram]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "youtube" | "yt" => Ok(Platform::YouTube),
            "facebook" | "fb" => Ok(Platform::Facebook),
            "instagram" | "ig" => Ok(Platform::Instagram),
            other => Err(ScanError::UnsupportedPlatform(other.to_string())),
        }
    }
}

/// A deep-scan driver for one platform.
///
/// Drivers never fail: every recoverable problem is noted in the report
/// and the driver continues with whatever it can still find.
#[async_trait]
pub trait PlatformScanner: Send + Sync {
    fn platform(&self) -> Platform;

    async fn scan(&self, page: &PageDocument) -> ScanReport;
}
