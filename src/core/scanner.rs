//! Scan orchestrator: routes pages to platform drivers and merges results

use crate::core::miner::{GraphMiner, DEFAULT_MAX_DEPTH};
use crate::core::registry::{StreamRegistry, TabId};
use crate::core::stream::ScanReport;
use crate::error::ScanError;
use crate::platform::{
    page_scan, FacebookScanner, HttpClientConfig, HttpFetcher, InstagramScanner, PageDocument,
    Platform, PlatformScanner, SourceFetcher, YouTubeScanner,
};
use crate::utils::url::detect_platform;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// HTTP settings for page and player fetches
    pub http: HttpClientConfig,
    /// Force a platform instead of detecting it from the page URL
    pub platform: Option<Platform>,
    /// Recursion ceiling for the graph miner
    pub max_depth: usize,
    /// Also collect `<video>`/`<source>` elements
    pub page_scan: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            http: HttpClientConfig::default(),
            platform: None,
            max_depth: DEFAULT_MAX_DEPTH,
            page_scan: true,
        }
    }
}

/// Main scanner
pub struct Scanner {
    options: ScanOptions,
    fetcher: Option<Arc<dyn SourceFetcher>>,
}

impl Scanner {
    /// Create a scanner with default options
    pub fn new() -> Self {
        Self {
            options: ScanOptions::default(),
            fetcher: None,
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Set HTTP timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.http.timeout = timeout;
        self
    }

    /// Override the User-Agent header
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.http.user_agent = Some(user_agent.into());
        self
    }

    /// Route requests through a proxy
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.options.http.proxy_url = Some(proxy_url.into());
        self
    }

    /// Skip platform detection
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.options.platform = Some(platform);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    pub fn with_page_scan(mut self, enabled: bool) -> Self {
        self.options.page_scan = enabled;
        self
    }

    /// Use a custom fetcher instead of an HTTP client built from the options
    pub fn with_fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    fn fetcher(&self) -> Result<Arc<dyn SourceFetcher>, ScanError> {
        match &self.fetcher {
            Some(fetcher) => Ok(fetcher.clone()),
            None => Ok(Arc::new(HttpFetcher::with_config(self.options.http.clone())?)),
        }
    }

    /// Platform for a page: the forced one, or detected from its URL
    pub fn platform_for(&self, page: &PageDocument) -> Result<Platform, ScanError> {
        if let Some(platform) = self.options.platform {
            return Ok(platform);
        }
        let url = page
            .url()
            .ok_or_else(|| ScanError::InvalidUrl("page has no URL to detect a platform from".to_string()))?;
        detect_platform(url.as_str())
    }

    /// Deep-scan driver for a platform
    pub fn driver(&self, platform: Platform) -> Result<Box<dyn PlatformScanner>, ScanError> {
        let miner = GraphMiner::new().with_max_depth(self.options.max_depth);
        Ok(match platform {
            Platform::YouTube => Box::new(YouTubeScanner::new(self.fetcher()?)),
            Platform::Facebook => Box::new(FacebookScanner::new().with_miner(miner)),
            Platform::Instagram => Box::new(InstagramScanner::new().with_miner(miner)),
        })
    }

    /// Fetch a page and wrap it as a document
    pub async fn load_page(&self, url: &str) -> Result<PageDocument, ScanError> {
        let document_url = url::Url::parse(url)?;
        info!("Loading page {}", url);
        let html = self.fetcher()?.fetch_text(url).await?;
        Ok(PageDocument::new(Some(document_url), html))
    }

    /// Run the platform deep scan for a page
    pub async fn deep_scan(&self, page: &PageDocument) -> Result<ScanReport, ScanError> {
        let platform = self.platform_for(page)?;
        debug!("Deep scanning as {}", platform);
        let driver = self.driver(platform)?;
        Ok(driver.scan(page).await)
    }

    /// Collect `<video>`/`<source>` addresses from a page
    pub fn page_scan(&self, page: &PageDocument) -> ScanReport {
        page_scan(page)
    }

    /// Page scan plus deep scan, merged into `registry` under `tab`.
    ///
    /// Pages of unsupported sites only get the page scan. Returns the deep
    /// scan report so callers can surface its issues.
    pub async fn scan_into_registry(
        &self,
        registry: &mut StreamRegistry,
        tab: TabId,
        page: &PageDocument,
    ) -> Result<ScanReport, ScanError> {
        if self.options.page_scan {
            registry.merge_report(tab, &self.page_scan(page));
        }

        let report = match self.deep_scan(page).await {
            Ok(report) => report,
            Err(ScanError::UnsupportedPlatform(host)) => {
                info!("No deep scanner for {}, page scan only", host);
                ScanReport::new()
            }
            Err(e) if e.is_recoverable() => {
                warn!("Deep scan skipped: {}", e);
                let mut report = ScanReport::new();
                report.note("deep scan", e.to_string());
                report
            }
            Err(e) => return Err(e),
        };
        registry.merge_report(tab, &report);

        info!("Tab {} now has {} streams", tab, registry.count(tab));
        Ok(report)
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}
