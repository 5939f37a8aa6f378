//! Unified error handling for the sitewatch crate
//!
//! Domain modules keep their own error enums. [`Error`] wraps the ones that
//! cross into command code, where [`SitewatchErrorTrait`] decides how a
//! failure is logged and reported.
//!
//! ```rust,ignore
//! use sitewatch::error::{Error, SitewatchErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(category = err.category().as_str(), "Retry later: {err}");
//!     } else {
//!         tracing::error!("Fatal error: {err}");
//!     }
//! }
//! ```

use thiserror::Error;

pub use crate::entities::TaggerError;
pub use crate::hasher::HashError;
pub use crate::report::ReportError;
pub use crate::scheduler::error::SchedulerError;
pub use crate::storage::StoreError;
pub use crate::utils::error::FetchError;

/// Common trait for sitewatch error types
pub trait SitewatchErrorTrait: std::error::Error {
    /// Whether a later attempt could succeed
    fn is_recoverable(&self) -> bool;

    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// HTTP, SFTP and local fetch failures, including client setup
    Network,
    /// State Store and Change Log files
    Storage,
    /// Settings rejected at startup
    Config,
    /// Tracked list and report scheduling
    Scheduler,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Scheduler => "scheduler",
        }
    }
}

/// Unified error type for the sitewatch crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Hash error: {0}")]
    Hash(#[from] HashError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

impl SitewatchErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_transient(),
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Store(StoreError::Io { .. }) => true,
            Self::Store(_) | Self::Hash(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(_) => ErrorCategory::Network,
            Self::Store(_) => ErrorCategory::Storage,
            Self::Hash(_) => ErrorCategory::Config,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_category() {
        let fetch_err = Error::Fetch(FetchError::Timeout {
            url: "http://a.test".to_string(),
        });
        assert_eq!(fetch_err.category(), ErrorCategory::Network);

        let hash_err: Error = HashError::UnsupportedAlgorithm("crc32".to_string()).into();
        assert_eq!(hash_err.category(), ErrorCategory::Config);
        assert_eq!(hash_err.category().as_str(), "config");
        assert!(!hash_err.is_recoverable());
    }

    #[test]
    fn test_is_recoverable() {
        let timeout = Error::Fetch(FetchError::Timeout {
            url: "http://a.test".to_string(),
        });
        assert!(timeout.is_recoverable());

        let unsupported = Error::Fetch(FetchError::UnsupportedScheme {
            scheme: "gopher".to_string(),
            resource: "gopher://a.test".to_string(),
        });
        assert!(!unsupported.is_recoverable());
    }

    #[test]
    fn test_store_errors() {
        let io: Error = StoreError::Io {
            path: PathBuf::from("state.json"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .into();
        assert_eq!(io.category(), ErrorCategory::Storage);
        assert!(io.is_recoverable());

        let corrupt: Error = StoreError::Corrupt {
            path: PathBuf::from("state.json"),
            source: serde_json::from_str::<u8>("{").unwrap_err(),
        }
        .into();
        assert!(!corrupt.is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let sched = SchedulerError::invalid_time("99:99");
        let unified: Error = sched.into();
        assert!(matches!(unified, Error::Scheduler(_)));
        assert_eq!(unified.category(), ErrorCategory::Scheduler);
        assert!(!unified.is_recoverable());
    }
}
