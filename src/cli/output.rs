//! Output formatting and scan progress display

use crate::cli::args::VerbosityLevel;
use crate::core::registry::DetectedStream;
use crate::core::stream::{ScanIssue, SourceMethod};
use crate::error::ScanError;
use crate::utils::format::truncate_middle;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Display width of a stream address in the listing
const ADDRESS_WIDTH: usize = 83;

/// Output formatter for vidscan
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    spinner: Option<ProgressBar>,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            spinner: None,
        }
    }

    /// Show a spinner while a scan stage runs
    pub fn start_spinner(&mut self, message: &str) -> Option<ProgressBar> {
        if self.verbosity == VerbosityLevel::Quiet {
            return None;
        }

        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        self.spinner = Some(spinner.clone());
        Some(spinner)
    }

    /// Update the spinner message
    pub fn set_stage(&self, message: &str) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Finish and clear the spinner
    pub fn finish_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("⚠️  {}", message);
        }
    }

    /// Print debug message
    pub fn debug(&self, message: &str) {
        if self.verbosity == VerbosityLevel::Verbose {
            println!("🐛 {}", message);
        }
    }

    /// Print the scan header
    pub fn print_scan_start(&self, url: &str, platform: Option<&str>) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        println!("🔎 Scanning {}", url);
        if let Some(platform) = platform {
            println!("🧭 Platform: {}", platform);
        }
        println!();
    }

    /// Print the detected streams as a listing
    pub fn print_streams(&self, streams: &[&DetectedStream]) {
        if streams.is_empty() {
            self.warning("No media streams found");
            return;
        }

        for (index, stream) in streams.iter().enumerate() {
            println!("{}", stream_line(index, stream));
        }
        if self.verbosity != VerbosityLevel::Quiet {
            println!();
            println!("📊 {} streams found", streams.len());
        }
    }

    /// Print stream addresses only
    pub fn print_urls(&self, streams: &[&DetectedStream]) {
        for stream in streams {
            println!("{}", stream.address());
        }
    }

    /// Print streams as a JSON array
    pub fn print_json(&self, streams: &[&DetectedStream]) -> Result<(), ScanError> {
        println!("{}", serde_json::to_string_pretty(streams)?);
        Ok(())
    }

    /// Print recovered scan issues
    pub fn print_issues(&self, issues: &[ScanIssue]) {
        for issue in issues {
            self.debug(&format!("{}: {}", issue.stage, issue.message));
        }
        if !issues.is_empty() && self.verbosity == VerbosityLevel::Normal {
            self.warning(&format!(
                "{} scan issues (run with --verbose for details)",
                issues.len()
            ));
        }
    }

    /// Print elapsed time
    pub fn print_scan_complete(&self, duration: Duration) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }
        println!("⏱️  Time: {}", humantime::format_duration(round_millis(duration)));
    }
}

fn round_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}

fn source_tag(source: SourceMethod) -> String {
    let label = format!("[{}]", source.label());
    match source {
        SourceMethod::Network => label.blue().to_string(),
        SourceMethod::PageScan => label.yellow().to_string(),
        SourceMethod::DeepScan => label.green().to_string(),
    }
}

fn stream_line(index: usize, stream: &DetectedStream) -> String {
    let quality = if stream.record.quality.is_empty() {
        "Unknown"
    } else {
        stream.record.quality.as_str()
    };
    let size = stream
        .size
        .as_deref()
        .map(|s| format!(" ({})", s))
        .unwrap_or_default();

    format!(
        "{:>3}. {} {}{}\n     {}",
        index + 1,
        source_tag(stream.record.source_method),
        quality.bold(),
        size,
        truncate_middle(stream.address(), ADDRESS_WIDTH)
    )
}
