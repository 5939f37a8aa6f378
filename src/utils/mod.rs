//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use regex::Regex;
use std::sync::OnceLock;

/// Split text into sentences on terminal punctuation followed by whitespace
pub fn split_sentences(text: &str) -> Vec<String> {
    static SENTENCE_END: OnceLock<Regex> = OnceLock::new();

    let re = SENTENCE_END.get_or_init(|| Regex::new(r"[.!?]+\s+").expect("Invalid regex pattern"));

    let mut sentences = Vec::new();
    let mut start = 0;
    for m in re.find_iter(text) {
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = m.end();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Longest sentence of `text`, used as a one-line summary
pub fn longest_sentence(text: &str) -> Option<String> {
    split_sentences(text)
        .into_iter()
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .fold(None, |best: Option<String>, s| match best {
            Some(b) if b.chars().count() >= s.chars().count() => Some(b),
            _ => Some(s),
        })
}

/// Truncate text to a maximum number of characters
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
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
