//! Error types for vidscan

use thiserror::Error;

/// Main error type for scan operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pattern miss: {0}")]
    PatternMiss(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("Depth limit of {0} levels exceeded")]
    DepthExceeded(usize),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

impl ScanError {
    /// Check if the player source or page could not be reached
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            ScanError::NetworkFailure(_) | ScanError::HttpStatus(_)
        )
    }

    /// Check if a scanning driver should swallow this error and keep going.
    ///
    /// Everything in the scan taxonomy is recovered locally; only
    /// caller mistakes (bad input URL, unknown platform) and local IO
    /// are reported to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScanError::ParseFailure(_)
                | ScanError::Json(_)
                | ScanError::PatternMiss(_)
                | ScanError::NetworkFailure(_)
                | ScanError::HttpStatus(_)
                | ScanError::DepthExceeded(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors() {
        assert!(ScanError::HttpStatus(404).is_network_error());
        assert!(!ScanError::PatternMiss("x".into()).is_network_error());
    }

    #[test]
    fn test_recoverable_taxonomy() {
        assert!(ScanError::ParseFailure("bad".into()).is_recoverable());
        assert!(ScanError::PatternMiss("anchor".into()).is_recoverable());
        assert!(ScanError::DepthExceeded(64).is_recoverable());
        assert!(ScanError::HttpStatus(503).is_recoverable());
        assert!(!ScanError::InvalidUrl("nope".into()).is_recoverable());
        assert!(!ScanError::UnsupportedPlatform("vimeo".into()).is_recoverable());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: ScanError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ScanError::Json(_)));
        assert!(err.is_recoverable());
    }
}
