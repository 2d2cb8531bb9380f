//! Command line argument parsing

use crate::platform::Platform;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// vidscan - find playable media streams in web pages
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Page URL (YouTube, Facebook, Instagram or any page with <video> tags)
    pub url: String,

    /// Read page markup from a saved file instead of fetching the URL
    #[arg(long, value_name = "FILE")]
    pub html: Option<PathBuf>,

    /// Force a platform instead of detecting it from the URL
    #[arg(long, value_enum)]
    pub platform: Option<Platform>,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Override User-Agent header
    #[arg(long, value_name = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Proxy URL (http/https/socks)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Recursion limit for embedded page data
    #[arg(long, default_value = "64")]
    pub max_depth: usize,

    /// Skip the <video>/<source> page scan
    #[arg(long)]
    pub no_page_scan: bool,

    /// Print streams as JSON
    #[arg(long)]
    pub json: bool,

    /// Print stream URLs only, one per line
    #[arg(short = 'g', long)]
    pub print_url: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (scan issues included)
    Verbose,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            url: String::new(),
            html: None,
            platform: None,
            timeout: humantime::Duration::from(Duration::from_secs(30)),
            user_agent: None,
            proxy: None,
            max_depth: 64,
            no_page_scan: false,
            json: false,
            print_url: false,
            verbose: false,
            quiet: false,
        }
    }
}
