//! Error types for resource fetching
//!
//! Every variant maps onto a [`FetchOutcome`] so failures can be logged per
//! resource without stopping a cycle.

use thiserror::Error;

use crate::models::FetchOutcome;

/// Errors that can occur while fetching a resource
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP transport error
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response
    #[error("HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    /// Request timeout
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// Connection could not be established
    #[error("Connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    /// Local path is missing or not a regular file
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// Local read failure
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No handler exists for the scheme
    #[error("Unsupported scheme '{scheme}' in {resource}")]
    UnsupportedScheme { scheme: String, resource: String },

    /// Identifier could not be parsed as a URL
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Secure-shell transfer failed after the connection was made
    #[error("SFTP transfer from {url} failed: {reason}")]
    Sftp { url: String, reason: String },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// Whether another attempt might succeed.
    ///
    /// Timeouts, connection failures and HTTP 429/5xx are transient. Other
    /// 4xx statuses, unsupported schemes and missing files are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { source, .. } => !source.is_builder() && !source.is_redirect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout { .. } | Self::Connection { .. } | Self::Sftp { .. } => true,
            Self::NotFound { .. }
            | Self::Io { .. }
            | Self::UnsupportedScheme { .. }
            | Self::InvalidUrl { .. }
            | Self::Client(_) => false,
        }
    }

    /// Outcome reported for this failure
    pub fn outcome(&self) -> FetchOutcome {
        match self {
            Self::UnsupportedScheme { .. } => FetchOutcome::UnsupportedScheme,
            _ => FetchOutcome::TransientError,
        }
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Status { .. } => "status",
            Self::Timeout { .. } => "timeout",
            Self::Connection { .. } => "connection",
            Self::NotFound { .. } => "not_found",
            Self::Io { .. } => "io",
            Self::UnsupportedScheme { .. } => "unsupported_scheme",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::Sftp { .. } => "sftp",
            Self::Client(_) => "client",
        }
    }

    /// Map a reqwest error onto the taxonomy
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if err.is_connect() {
            Self::Connection {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transience() {
        let server_error = FetchError::Status {
            url: "http://x".into(),
            status: 503,
        };
        let rate_limited = FetchError::Status {
            url: "http://x".into(),
            status: 429,
        };
        let not_found = FetchError::Status {
            url: "http://x".into(),
            status: 404,
        };
        assert!(server_error.is_transient());
        assert!(rate_limited.is_transient());
        assert!(!not_found.is_transient());
    }

    #[test]
    fn test_outcome_mapping() {
        let unsupported = FetchError::UnsupportedScheme {
            scheme: "gopher".into(),
            resource: "gopher://x".into(),
        };
        assert_eq!(unsupported.outcome(), FetchOutcome::UnsupportedScheme);
        assert!(!unsupported.is_transient());

        let missing = FetchError::NotFound {
            path: "/nope".into(),
        };
        assert_eq!(missing.outcome(), FetchOutcome::TransientError);
        assert!(!missing.is_transient());

        let timeout = FetchError::Timeout {
            url: "http://x".into(),
        };
        assert_eq!(timeout.outcome(), FetchOutcome::TransientError);
        assert!(timeout.is_transient());
    }

    #[test]
    fn test_display_messages() {
        let err = FetchError::Connection {
            url: "sftp://bad-host/file".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "Connection to sftp://bad-host/file failed: connection refused"
        );
        assert_eq!(err.kind(), "connection");
    }
}
