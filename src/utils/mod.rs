//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Strip exactly one trailing slash, the form stored in history
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    url.strip_suffix('/').unwrap_or(url).to_string()
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Lowercase slug for archive file names and URLs
pub fn slugify(text: &str) -> String {
    static NON_SLUG: OnceLock<Regex> = OnceLock::new();

    let re = NON_SLUG.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("Invalid regex pattern"));

    let lowered = text.to_lowercase();
    re.replace_all(&lowered, "-").trim_matches('-').to_string()
}

/// Truncate text to at most `max_len` characters, ending with `...`
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated.trim_end())
    }
}

/// Number of user-perceived characters
pub fn grapheme_len(text: &str) -> usize {
    text.graphemes(true).count()
}

/// Truncate to `max` graphemes, ending with `...` when shortened
pub fn truncate_graphemes(text: &str, max: usize) -> String {
    if grapheme_len(text) <= max {
        return text.to_string();
    }
    let kept: String = text.graphemes(true).take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Write a file by renaming a sibling temp file over it
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = std::path::PathBuf::from(temp);

    std::fs::write(&temp, contents)?;
    std::fs::rename(&temp, path)
}

/// Format byte size as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return String::from("0 B");
    }

    let base: f64 = 1024.0;
    let exponent = (bytes as f64).log(base).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let value = bytes as f64 / base.powi(exponent as i32);

    format!("{value:.2} {}", UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_strips_one_slash() {
        assert_eq!(normalize_url("https://x/y/"), "https://x/y");
        assert_eq!(normalize_url("https://x/y"), "https://x/y");
        assert_eq!(normalize_url("https://x/y//"), "https://x/y/");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  hello   world  "), "hello world");
        assert_eq!(normalize_whitespace("hello\n\nworld"), "hello world");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Octo Cat_Tools!"), "octo-cat-tools");
        assert_eq!(slugify("--a--b--"), "a-b");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("very long text here", 10), "very lo...");
        assert_eq!(truncate_text("ünïcödé ünïcödé", 8), "ünïcö...");
    }

    #[test]
    fn test_truncate_graphemes() {
        let flag = "🇰🇷";
        assert_eq!(grapheme_len(flag), 1);
        assert_eq!(truncate_graphemes("abcdef", 6), "abcdef");
        assert_eq!(truncate_graphemes("abcdefg", 6), "abc...");
    }

    #[test]
    fn test_write_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.txt");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.path().join("nested").join("state.txt.tmp").exists());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1_048_576), "1.00 MB");
    }
}
