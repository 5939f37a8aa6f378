//! Error types for the scheduler module

use std::fmt;
use std::path::PathBuf;

use crate::storage::StoreError;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// Tracked resource list could not be read
    SitesUnavailable { path: PathBuf, reason: String },

    /// Tracked resource list is not valid JSON
    SitesMalformed { path: PathBuf, reason: String },

    /// Time of day not in `HH:MM` form
    InvalidTime { value: String },

    /// Unknown day name
    InvalidWeekday { value: String },

    /// State Store or Change Log could not be opened for writing
    StoreUnavailable(StoreError),

    /// Report generation failed
    ReportFailed { reason: String },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SitesUnavailable { path, reason } => {
                write!(f, "Cannot read tracked sites file {}: {}", path.display(), reason)
            }
            Self::SitesMalformed { path, reason } => {
                write!(f, "Malformed tracked sites file {}: {}", path.display(), reason)
            }
            Self::InvalidTime { value } => {
                write!(f, "Invalid time '{}'. Expected HH:MM", value)
            }
            Self::InvalidWeekday { value } => {
                write!(f, "Invalid weekday '{}'. Expected a day name such as Monday", value)
            }
            Self::StoreUnavailable(err) => {
                write!(f, "Durable store unavailable: {}", err)
            }
            Self::ReportFailed { reason } => {
                write!(f, "Report generation failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StoreUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for SchedulerError {
    fn from(err: StoreError) -> Self {
        Self::StoreUnavailable(err)
    }
}

impl SchedulerError {
    pub fn invalid_time(value: impl Into<String>) -> Self {
        Self::InvalidTime {
            value: value.into(),
        }
    }

    pub fn invalid_weekday(value: impl Into<String>) -> Self {
        Self::InvalidWeekday {
            value: value.into(),
        }
    }

    /// Whether the scheduler can keep running after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SitesUnavailable { .. } | Self::SitesMalformed { .. } | Self::ReportFailed { .. }
        )
    }
}
