//! HTTP(S) fetcher
//!
//! A single request per call with a bounded timeout and a fixed user agent.
//! Any non-2xx status is a failure, never partial content.

use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::utils::error::FetchError;

/// HTTP fetcher with configured timeout and compression
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new fetcher
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Client` if the HTTP client cannot be created
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(user_agent)
            .gzip(true)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client })
    }

    /// GET `url` and return the body bytes
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

        Ok(body.to_vec())
    }
}
