//! Resource fetching across HTTP, local files and SFTP
//!
//! A resource identifier is resolved to a [`SourceKind`] first:
//!
//! - no `scheme://` prefix: a local file when the path exists, else `http://` is
//!   prepended
//! - `http` / `https`: HTTP GET
//! - `ftp` / `ftps` / `sftp`: secure-shell file transfer
//! - `file`: local filesystem read
//! - anything else: unsupported, failing immediately without retry
//!
//! Transient failures are retried under the configured [`RetryConfig`]; a
//! pending backoff is abandoned on shutdown.

pub mod http;
pub mod local;
pub mod sftp;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::config::FetchConfig;
use crate::models::{FetchOutcome, FetchResult, Resource};
use crate::parser::detect::detect_content_type;
use crate::utils::error::FetchError;
use crate::utils::format_bytes;
use crate::utils::retry::{with_retry_until, RetryConfig};

pub use http::HttpFetcher;
pub use sftp::SftpFetcher;

/// Protocol handler chosen for a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Http(Url),
    Sftp(Url),
    LocalFile(PathBuf),
    Unsupported(String),
}

/// Pick a protocol handler for `resource`
pub fn resolve(resource: &Resource) -> Result<SourceKind, FetchError> {
    let id = resource.as_str();

    let parse = |raw: &str| {
        Url::parse(raw).map_err(|e| FetchError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })
    };

    match resource.scheme().as_deref() {
        None => {
            if Path::new(id).exists() {
                Ok(SourceKind::LocalFile(PathBuf::from(id)))
            } else {
                Ok(SourceKind::Http(parse(&format!("http://{id}"))?))
            }
        }
        Some("http" | "https") => Ok(SourceKind::Http(parse(id)?)),
        Some("ftp" | "ftps" | "sftp") => Ok(SourceKind::Sftp(parse(id)?)),
        Some("file") => {
            let url = parse(id)?;
            url.to_file_path()
                .map(SourceKind::LocalFile)
                .map_err(|_| FetchError::InvalidUrl {
                    url: id.to_string(),
                    reason: "not a local file path".to_string(),
                })
        }
        Some(other) => Ok(SourceKind::Unsupported(other.to_string())),
    }
}

/// Anything that can turn a resource into raw bytes
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, resource: &Resource) -> Result<Vec<u8>, FetchError>;
}

/// Fetch `resource` and classify the returned bytes
pub async fn fetch_resource(
    fetcher: &dyn Fetch,
    resource: &Resource,
) -> Result<FetchResult, FetchError> {
    let bytes = fetcher.fetch(resource).await?;
    let content_type = detect_content_type(&bytes, resource);
    debug!(
        resource = %resource,
        size = %format_bytes(bytes.len() as u64),
        content_type = %content_type,
        "Fetched resource"
    );

    Ok(FetchResult {
        resource: resource.clone(),
        bytes,
        content_type,
        outcome: FetchOutcome::Success,
    })
}

/// Default fetcher dispatching on [`SourceKind`]
pub struct ResourceFetcher {
    http: HttpFetcher,
    sftp: SftpFetcher,
    retry: RetryConfig,
    cancel: CancellationToken,
}

impl ResourceFetcher {
    /// Build a fetcher from the `[fetch]` section
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Client` if the HTTP client cannot be created
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let timeout = std::time::Duration::from_secs(config.timeout_secs);
        Ok(Self {
            http: HttpFetcher::new(timeout, &config.user_agent)?,
            sftp: SftpFetcher::new(
                timeout,
                config.sftp_port,
                config.sftp_default_user.clone(),
            ),
            retry: RetryConfig::from_fetch_config(config),
            cancel: CancellationToken::new(),
        })
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Stop retrying once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    async fn fetch_once(&self, source: &SourceKind, resource: &Resource) -> Result<Vec<u8>, FetchError> {
        match source {
            SourceKind::Http(url) => self.http.fetch(url).await,
            SourceKind::Sftp(url) => self.sftp.fetch(url).await,
            SourceKind::LocalFile(path) => local::read_file(path).await,
            SourceKind::Unsupported(scheme) => Err(FetchError::UnsupportedScheme {
                scheme: scheme.clone(),
                resource: resource.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Fetch for ResourceFetcher {
    async fn fetch(&self, resource: &Resource) -> Result<Vec<u8>, FetchError> {
        let source = resolve(resource)?;
        debug!(resource = %resource, source = ?source, "Resolved resource");

        with_retry_until(
            &self.retry,
            &self.cancel,
            || self.fetch_once(&source, resource),
            FetchError::is_transient,
        )
        .await
    }
}
