//! Secure-shell file transfer fetcher
//!
//! `ftp`, `ftps` and `sftp` URLs are all served over SFTP. A session is opened
//! per call and always disconnected before returning, on success and on every
//! error path. `ssh2` is blocking, so the transfer runs on the blocking pool.

use percent_encoding::percent_decode_str;
use ssh2::Session;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::utils::error::FetchError;

/// SFTP fetcher with per-call sessions
#[derive(Debug, Clone)]
pub struct SftpFetcher {
    timeout: Duration,
    default_port: u16,
    default_user: String,
}

impl SftpFetcher {
    pub fn new(timeout: Duration, default_port: u16, default_user: String) -> Self {
        Self {
            timeout,
            default_port,
            default_user,
        }
    }

    /// Download the file named by `url`
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let target = SftpTarget::from_url(url, self.default_port, &self.default_user)?;
        let timeout = self.timeout;
        let url_text = url.to_string();

        tokio::task::spawn_blocking(move || target.download(timeout))
            .await
            .map_err(|e| FetchError::Sftp {
                url: url_text,
                reason: format!("transfer task failed: {e}"),
            })?
    }
}

/// Connection parameters extracted from a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SftpTarget {
    url: String,
    host: String,
    port: u16,
    user: String,
    password: String,
    path: String,
}

impl SftpTarget {
    pub(crate) fn from_url(
        url: &Url,
        default_port: u16,
        default_user: &str,
    ) -> Result<Self, FetchError> {
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| FetchError::InvalidUrl {
                url: url.to_string(),
                reason: "missing host".to_string(),
            })?;

        let user = if url.username().is_empty() {
            default_user.to_string()
        } else {
            percent_decode(url.username())
        };

        Ok(Self {
            url: url.to_string(),
            host: host.to_string(),
            port: url.port().unwrap_or(default_port),
            user,
            password: url.password().map(percent_decode).unwrap_or_default(),
            path: percent_decode(url.path()),
        })
    }

    fn connection_error(&self, reason: impl std::fmt::Display) -> FetchError {
        FetchError::Connection {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }

    fn transfer_error(&self, reason: impl std::fmt::Display) -> FetchError {
        FetchError::Sftp {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }

    fn download(&self, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| self.connection_error(e))?
            .next()
            .ok_or_else(|| self.connection_error("host resolved to no address"))?;

        let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(|e| self.connection_error(e))?;
        tcp.set_read_timeout(Some(timeout))
            .and_then(|_| tcp.set_write_timeout(Some(timeout)))
            .map_err(|e| self.connection_error(e))?;

        let mut session = Session::new().map_err(|e| self.connection_error(e))?;
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        session.set_tcp_stream(tcp);

        // Declared before the sftp handle so it is dropped last.
        let mut guard = SessionGuard(session);

        guard.0.handshake().map_err(|e| self.connection_error(e))?;
        guard
            .0
            .userauth_password(&self.user, &self.password)
            .map_err(|e| self.connection_error(e))?;
        if !guard.0.authenticated() {
            return Err(self.connection_error("authentication rejected"));
        }

        let sftp = guard.0.sftp().map_err(|e| self.transfer_error(e))?;
        let mut file = sftp
            .open(Path::new(&self.path))
            .map_err(|e| self.transfer_error(e))?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|e| self.transfer_error(e))?;

        debug!(host = %self.host, path = %self.path, bytes = buf.len(), "SFTP download complete");
        Ok(buf)
    }
}

struct SessionGuard(Session);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let _ = self.0.disconnect(None, "sitewatch transfer complete", None);
    }
}

fn percent_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}
