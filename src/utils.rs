//! Utility functions for string shortening and output path validation.
//!
//! - String truncation for logging and fixed-width table cells
//! - Early validation of export paths, before any network work

use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Largest char boundary in `s` that is `<= max` bytes.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let cut = floor_char_boundary(s, max);
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

/// Shorten `s` to at most `width` characters, marking the cut with `…`.
pub fn ellipsize(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(width - 1).collect();
    out.push('…');
    out
}

/// Ensure the directory that will hold `path` exists and is writable.
///
/// Creates missing parent directories, then writes and removes a scratch file
/// next to the target.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_parent(path: &Path) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).await?;

    let scratch = dir.join(".fno_news_write_check");
    fs::write(&scratch, b"").await?;
    let _ = fs::remove_file(&scratch).await;
    info!(dir = %dir.display(), "Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // "₹" is three bytes
        let result = truncate_for_log("₹₹₹", 4);
        assert_eq!(result, "₹…(+6 bytes)");
    }

    #[test]
    fn test_ellipsize() {
        assert_eq!(ellipsize("TCS", 10), "TCS");
        assert_eq!(ellipsize("Reliance Industries", 8), "Relianc…");
        assert_eq!(ellipsize("Dr Reddy's", 10), "Dr Reddy's");
        assert_eq!(ellipsize("abc", 0), "");
    }

    #[tokio::test]
    async fn test_ensure_writable_parent_creates_dirs() {
        let dir = std::env::temp_dir().join(format!("fno_news_utils_{}", std::process::id()));
        let target = dir.join("a").join("b").join("out.csv");
        ensure_writable_parent(&target).await.unwrap();
        assert!(dir.join("a").join("b").is_dir());
        assert!(!target.exists());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
