//! Text normalization for extracted content
//!
//! Every extraction path ends in [`normalize_text`], so equal content always
//! reduces to byte-identical text and therefore to equal digests.
//!
//! Entity decoding is not part of normalization. Text read through `scraper`
//! is already decoded, and decoding it again would make `&amp;lt;` and `&lt;`
//! pages indistinguishable. Only the markdown stage, whose output still
//! carries the page's raw entities, calls [`decode_entities`].

use regex::Regex;
use std::sync::LazyLock;

static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\x{00A0}]+").unwrap());

static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static PHRASE_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

/// Reduce extracted text to its canonical form
///
/// Invisible formatting characters and control characters other than newline
/// and tab are dropped. Runs of spaces, tabs and non-breaking spaces become
/// one space, each line is trimmed, and blank runs shrink to one empty line.
///
/// ```
/// use sitewatch::parser::normalize::normalize_text;
///
/// let text = "\u{FEFF}  Rates\u{200B}   held \n\n\n\n steady ";
/// assert_eq!(normalize_text(text), "Rates held\n\nsteady");
/// ```
pub fn normalize_text(text: &str) -> String {
    let visible: String = text.chars().filter(|c| is_visible(*c)).collect();

    let lines = visible
        .lines()
        .map(|line| INLINE_SPACE.replace_all(line, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_RUN.replace_all(&lines, "\n\n").trim().to_string()
}

// Zero-width marks, bidi controls, line/paragraph separators and the BOM
// never change what a reader sees.
fn is_visible(c: char) -> bool {
    match c {
        '\n' | '\t' => true,
        '\u{200B}'..='\u{200F}' | '\u{2028}'..='\u{202F}' | '\u{FEFF}' => false,
        c => !c.is_control(),
    }
}

/// Decode HTML character references exactly once
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Drop anything that looks like a markup tag
pub fn strip_tags(text: &str) -> String {
    MARKUP_TAG.replace_all(text, "").into_owned()
}

/// Non-empty after trimming
pub fn has_text(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Put every line and every double-space separated phrase on its own line
///
/// Runs before [`normalize_text`] so the wide gaps left by removed markup
/// still separate phrases. Blank phrases are dropped.
pub fn split_phrases(text: &str) -> String {
    text.lines()
        .flat_map(|line| PHRASE_GAP.split(line.trim()))
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
