//! Content hashing
//!
//! Digests are computed over the UTF-8 bytes of normalized text. Two optional
//! limits trade sensitivity for cost:
//!
//! - `max_size_mb` truncates very large content before hashing, so changes past
//!   the limit are invisible to change detection.
//! - `initial_bytes` hashes only a prefix, a cheap pre-check for large pages
//!   that change slowly.
//!
//! Truncation is applied first, then the prefix limit. Input is `&str`, so
//! non-text input cannot reach the hasher.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::HashingConfig;
use crate::models::{ContentDigest, Resource};

/// Binary megabyte used by `max_size_mb`
pub const BYTES_PER_MB: usize = 1024 * 1024;

/// Errors raised while configuring a hasher
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Algorithm name not recognized
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A size limit of zero would hash nothing
    #[error("Invalid hashing option {name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Md5,
    Blake3,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Md5 => "md5",
            Self::Blake3 => "blake3",
        }
    }

    /// MD5 is kept for cheap equality checks only
    pub fn is_cryptographic(&self) -> bool {
        !matches!(self, Self::Md5)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "md5" => Ok(Self::Md5),
            "blake3" => Ok(Self::Blake3),
            other => Err(HashError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Hash `text` and return the lowercase hex digest
pub fn hash_content(
    text: &str,
    algorithm: HashAlgorithm,
    initial_bytes: Option<usize>,
    max_size_mb: Option<usize>,
) -> String {
    let mut bytes = text.as_bytes();

    if let Some(mb) = max_size_mb {
        let limit = mb.saturating_mul(BYTES_PER_MB);
        if bytes.len() > limit {
            bytes = &bytes[..limit];
        }
    }

    if let Some(prefix) = initial_bytes {
        if bytes.len() > prefix {
            bytes = &bytes[..prefix];
        }
    }

    digest_hex(bytes, algorithm)
}

fn digest_hex(bytes: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
        HashAlgorithm::Md5 => format!("{:x}", md5::Md5::digest(bytes)),
        HashAlgorithm::Blake3 => blake3::hash(bytes).to_hex().to_string(),
    }
}

/// Hasher bound to one algorithm and limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
    initial_bytes: Option<usize>,
    max_size_mb: Option<usize>,
}

impl ContentHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            initial_bytes: None,
            max_size_mb: None,
        }
    }

    pub fn with_initial_bytes(mut self, initial_bytes: Option<usize>) -> Self {
        self.initial_bytes = initial_bytes;
        self
    }

    pub fn with_max_size_mb(mut self, max_size_mb: Option<usize>) -> Self {
        self.max_size_mb = max_size_mb;
        self
    }

    /// Build from the `[hashing]` section, rejecting unknown algorithms
    pub fn from_config(config: &HashingConfig) -> Result<Self, HashError> {
        let algorithm = config.algorithm.parse::<HashAlgorithm>()?;

        if config.initial_bytes == Some(0) {
            return Err(HashError::InvalidOption {
                name: "initial_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if config.max_size_mb == Some(0) {
            return Err(HashError::InvalidOption {
                name: "max_size_mb",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self::new(algorithm)
            .with_initial_bytes(config.initial_bytes)
            .with_max_size_mb(config.max_size_mb))
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn hash(&self, text: &str) -> String {
        hash_content(text, self.algorithm, self.initial_bytes, self.max_size_mb)
    }

    /// Hash `text` and stamp the result for `resource`
    pub fn digest(&self, resource: &Resource, text: &str) -> ContentDigest {
        ContentDigest {
            resource: resource.clone(),
            algorithm: self.algorithm,
            hex: self.hash(text),
            computed_at: Utc::now(),
        }
    }
}
