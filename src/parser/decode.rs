//! Byte-to-text decoding
//!
//! HTML honours a byte order mark first, then a `charset` declared in the
//! first 1024 bytes, then falls back to UTF-8 with replacement characters.
//! Plain text is always UTF-8 with replacement.

use encoding_rs::Encoding;
use regex::Regex;
use std::sync::LazyLock;

const CHARSET_SCAN_LEN: usize = 1024;

static CHARSET_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*["']?\s*([a-z0-9_.:\-]+)"#).unwrap()
});

/// Encoding declared in the markup head, if any
pub fn sniff_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(CHARSET_SCAN_LEN)];
    let head = String::from_utf8_lossy(head);
    let label = CHARSET_REGEX.captures(&head)?.get(1)?.as_str();
    Encoding::for_label(label.as_bytes())
}

/// Decode HTML bytes to a string
pub fn decode_html(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }

    if let Some(encoding) = sniff_charset(bytes) {
        let (text, _, _) = encoding.decode(bytes);
        return text.into_owned();
    }

    String::from_utf8_lossy(bytes).into_owned()
}

/// Decode plain text bytes as UTF-8, replacing invalid sequences
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
