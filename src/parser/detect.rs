//! Content type detection
//!
//! Priority order: a recognized extension hint, then binary signatures, then
//! textual sniffing, then a default based on the resource scheme. Detection
//! never fails; undecodable input ends up as `Unknown`.

use crate::models::{ContentType, Resource};

const SNIFF_LEN: usize = 100;

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Map a file extension onto a content type
pub fn from_extension(ext: &str) -> Option<ContentType> {
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => Some(ContentType::Pdf),
        "doc" | "docx" => Some(ContentType::Doc),
        "txt" | "csv" | "json" => Some(ContentType::Text),
        "htm" | "html" => Some(ContentType::Html),
        _ => None,
    }
}

/// Classify `bytes` fetched from `resource`
pub fn detect_content_type(bytes: &[u8], resource: &Resource) -> ContentType {
    if let Some(content_type) = resource.extension().as_deref().and_then(from_extension) {
        return content_type;
    }

    if bytes.starts_with(PDF_MAGIC) {
        return ContentType::Pdf;
    }
    if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
        return ContentType::Doc;
    }

    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    let lowered = String::from_utf8_lossy(head).to_lowercase();
    if lowered.contains("<!doctype html") || lowered.contains("<html") {
        return ContentType::Html;
    }

    if head
        .iter()
        .all(|&b| (32..=126).contains(&b) || matches!(b, b'\t' | b'\n' | b'\r'))
    {
        return ContentType::Text;
    }

    if resource.looks_like_http() {
        ContentType::Html
    } else {
        ContentType::Unknown
    }
}
