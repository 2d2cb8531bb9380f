//! Main entry point for vidscan CLI

use clap::Parser;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidscan::cli::output::OutputFormatter;
use vidscan::cli::Args;
use vidscan::core::registry::TabId;
use vidscan::utils::url::detect_platform;
use vidscan::{PageDocument, ScanError, Scanner, StreamRegistry};

/// Registry slot used for the single page a CLI run scans
const CLI_TAB: TabId = 0;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging()?;

    // Parse command line arguments
    let args = Args::parse();

    info!("Starting vidscan with args: {:?}", args);

    let mut formatter = OutputFormatter::new(args.verbosity_level());
    let scanner = build_scanner(&args);
    let start_time = Instant::now();

    let quiet_listing = args.json || args.print_url;
    if !quiet_listing {
        let platform = args
            .platform
            .or_else(|| detect_platform(&args.url).ok())
            .map(|p| p.to_string());
        formatter.print_scan_start(&args.url, platform.as_deref());
        formatter.start_spinner("Loading page...");
    }

    let page = match &args.html {
        Some(path) => read_saved_page(&args.url, path).await?,
        None => scanner.load_page(&args.url).await?,
    };
    debug!("Page has {} bytes of markup", page.html().len());

    formatter.set_stage("Scanning...");
    let mut registry = StreamRegistry::new();
    let result = scanner
        .scan_into_registry(&mut registry, CLI_TAB, &page)
        .await;
    formatter.finish_spinner();
    let report = result?;

    let streams = registry.streams(CLI_TAB);
    if args.json {
        formatter.print_json(&streams)?;
    } else if args.print_url {
        formatter.print_urls(&streams);
    } else {
        formatter.print_streams(&streams);
        formatter.print_issues(report.issues());
        formatter.print_scan_complete(start_time.elapsed());
    }

    Ok(())
}

/// Map CLI arguments onto scanner options
fn build_scanner(args: &Args) -> Scanner {
    let mut scanner = Scanner::new()
        .with_timeout(args.timeout_duration())
        .with_max_depth(args.max_depth)
        .with_page_scan(!args.no_page_scan);

    if let Some(user_agent) = &args.user_agent {
        scanner = scanner.with_user_agent(user_agent);
    }
    if let Some(proxy) = &args.proxy {
        scanner = scanner.with_proxy(proxy);
    }
    if let Some(platform) = args.platform {
        scanner = scanner.with_platform(platform);
    }
    scanner
}

/// Load saved page markup, attributed to `url`
async fn read_saved_page(url: &str, path: &Path) -> Result<PageDocument, ScanError> {
    info!("Reading saved page {}", path.display());
    let html = tokio::fs::read_to_string(path).await?;
    PageDocument::from_url(url, html)
}

/// Initialize logging system
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    // Get log level from environment or default to info
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();

    Ok(())
}
