//! Core data structures shared across the monitoring pipeline
//!
//! A [`Resource`] flows through fetch, detection, extraction and hashing.
//! Only [`ResourceState`] and [`ChangeLogEntry`] are ever persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::hasher::HashAlgorithm;

// ============================================================================
// Resource
// ============================================================================

/// A tracked content source: a URL, a bare host or a filesystem path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(String);

impl Resource {
    /// Create a resource identifier, trimming surrounding whitespace
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self(id.trim().to_string())
    }

    /// Raw identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased scheme if the identifier carries a `scheme://` prefix
    pub fn scheme(&self) -> Option<String> {
        let (scheme, _) = self.0.split_once("://")?;
        let mut chars = scheme.chars();
        let first = chars.next()?;
        if !first.is_ascii_alphabetic() {
            return None;
        }
        if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
            Some(scheme.to_ascii_lowercase())
        } else {
            None
        }
    }

    /// Whether the identifier is an explicit HTTP(S) URL
    pub fn looks_like_http(&self) -> bool {
        matches!(self.scheme().as_deref(), Some("http" | "https"))
    }

    /// Path component used for extension hints and display names.
    ///
    /// For URLs the query string and fragment are ignored.
    fn path_part(&self) -> String {
        if self.scheme().is_some() {
            if let Ok(url) = Url::parse(&self.0) {
                return url.path().to_string();
            }
            let rest = self.0.split_once("://").map(|(_, r)| r).unwrap_or("");
            let rest = rest.split(['?', '#']).next().unwrap_or("");
            return rest.find('/').map(|i| rest[i..].to_string()).unwrap_or_default();
        }
        self.0.clone()
    }

    /// Last path segment, or the whole identifier when there is none
    pub fn file_name(&self) -> String {
        let path = self.path_part();
        path.rsplit(['/', '\\'])
            .find(|segment| !segment.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.0.clone())
    }

    /// Lowercased file extension of the last path segment, if any
    pub fn extension(&self) -> Option<String> {
        let path = self.path_part();
        let last = path.rsplit(['/', '\\']).next()?;
        let (stem, ext) = last.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Resource {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Resource {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// Fetch and extraction results
// ============================================================================

/// Classification of fetched bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Html,
    Pdf,
    Doc,
    Text,
    Unknown,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Text => "text",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a fetch attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    Success,
    TransientError,
    UnsupportedScheme,
}

impl FetchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::TransientError => "transient_error",
            Self::UnsupportedScheme => "unsupported_scheme",
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw bytes of one successful fetch together with the detected type.
///
/// Never persisted; dropped once extraction is done.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub resource: Resource,
    pub bytes: Vec<u8>,
    pub content_type: ContentType,
    pub outcome: FetchOutcome,
}

/// Optional metadata recovered during extraction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

/// Normalized text produced by the extractor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub text: String,
    pub metadata: ContentMetadata,
    /// Name of the strategy that produced `text`
    pub strategy: String,
}

// ============================================================================
// Digests and persisted state
// ============================================================================

/// Digest of one resource's normalized text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDigest {
    pub resource: Resource,
    pub algorithm: HashAlgorithm,
    pub hex: String,
    pub computed_at: DateTime<Utc>,
}

/// Kind of domain entity found by a tagger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Organization,
    Publication,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Publication => "publication",
        }
    }
}

/// A domain entity matched in extracted text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchedEntity {
    /// Surface form that matched
    pub text: String,
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Persisted per-resource record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Hex digest of the last observed content
    pub digest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<HashAlgorithm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entities: Vec<MatchedEntity>,
}

impl ResourceState {
    pub fn from_digest(digest: &ContentDigest, entities: Vec<MatchedEntity>) -> Self {
        Self {
            digest: digest.hex.clone(),
            algorithm: Some(digest.algorithm),
            updated_at: Some(digest.computed_at),
            entities,
        }
    }
}

/// One append-only change log record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub resource: Resource,
    pub timestamp: DateTime<Utc>,
    pub changed: bool,
    pub old_digest: Option<String>,
    pub new_digest: Option<String>,
    #[serde(default)]
    pub entities: Vec<MatchedEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<FetchOutcome>,
}

impl ChangeLogEntry {
    /// Entry recording a detected change
    pub fn change(
        resource: Resource,
        old_digest: Option<String>,
        new_digest: String,
        entities: Vec<MatchedEntity>,
    ) -> Self {
        Self {
            resource,
            timestamp: Utc::now(),
            changed: true,
            old_digest,
            new_digest: Some(new_digest),
            entities,
            error: None,
            outcome: Some(FetchOutcome::Success),
        }
    }

    /// Entry recording a per-resource failure
    pub fn failure(
        resource: Resource,
        old_digest: Option<String>,
        outcome: FetchOutcome,
        error: impl Into<String>,
    ) -> Self {
        Self {
            resource,
            timestamp: Utc::now(),
            changed: false,
            old_digest,
            new_digest: None,
            entities: Vec::new(),
            error: Some(error.into()),
            outcome: Some(outcome),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
