//! Human-readable formatting helpers

const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB", "TB"];
const THRESHOLD: f64 = 1024.0;

/// Format a byte count with 1024-based units, e.g. `1536` -> `"1.5 KB"`.
///
/// Returns `None` for zero, which means "size unknown" to callers.
pub fn format_bytes(bytes: u64) -> Option<String> {
    if bytes == 0 {
        return None;
    }

    let bytes_f64 = bytes as f64;
    let exp = (bytes_f64.ln() / THRESHOLD.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes_f64 / THRESHOLD.powi(exp as i32);

    // two decimals, trailing zeros dropped
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    Some(format!("{} {}", trimmed, UNITS[exp]))
}

/// Shorten a long URL for display, keeping both ends
pub fn truncate_middle(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars || max_chars < 8 {
        return text.to_string();
    }
    let half = (max_chars - 3) / 2;
    let head: String = text.chars().take(half).collect();
    let tail: String = text.chars().skip(count - half).collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), None);
        assert_eq!(format_bytes(512).as_deref(), Some("512 Bytes"));
        assert_eq!(format_bytes(1024).as_deref(), Some("1 KB"));
        assert_eq!(format_bytes(1536).as_deref(), Some("1.5 KB"));
        assert_eq!(format_bytes(1024 * 1024 * 3 / 2 + 10_000).as_deref(), Some("1.51 MB"));
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024).as_deref(), Some("5 GB"));
    }

    #[test]
    fn test_truncate_middle() {
        let url = format!("https://cdn.example.com/{}", "a".repeat(100));
        let short = truncate_middle(&url, 83);
        assert_eq!(short.chars().count(), 83);
        assert!(short.starts_with("https://cdn"));
        assert!(short.contains("..."));
        assert_eq!(truncate_middle("short", 80), "short");
    }
}
