//! Integration tests for ResourceFetcher using wiremock
//!
//! These tests validate HTTP retry behavior, local reads and scheme handling.

use sitewatch::config::FetchConfig;
use sitewatch::fetcher::{fetch_resource, Fetch, ResourceFetcher};
use sitewatch::models::{ContentType, FetchOutcome, Resource};
use sitewatch::utils::error::FetchError;
use sitewatch::utils::retry::RetryConfig;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_fetcher(max_retries: u32) -> ResourceFetcher {
    let config = FetchConfig {
        timeout_secs: 5,
        user_agent: "sitewatch-test/1.0".to_string(),
        ..FetchConfig::default()
    };
    ResourceFetcher::new(&config).unwrap().with_retry(RetryConfig {
        max_retries,
        base_delay_ms: 1,
        max_delay_ms: 5,
        backoff_multiplier: 2.0,
    })
}

/// Test successful fetch from mock server
#[tokio::test]
async fn test_fetch_success() {
    let mock_server = MockServer::start().await;
    let html = "<html><head><title>Minutes</title></head><body><p>Rates unchanged.</p></body></html>";

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(0);
    let resource = Resource::new(format!("{}/page", mock_server.uri()));
    let fetched = fetch_resource(&fetcher, &resource).await.unwrap();

    assert_eq!(fetched.outcome, FetchOutcome::Success);
    assert_eq!(fetched.content_type, ContentType::Html);
    assert_eq!(fetched.bytes, html.as_bytes());
}

/// Test that the configured user agent is sent
#[tokio::test]
async fn test_user_agent_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ua"))
        .and(header("user-agent", "sitewatch-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(0);
    let resource = Resource::new(format!("{}/ua", mock_server.uri()));
    assert!(fetcher.fetch(&resource).await.is_ok());
}

/// A shutdown stops the retry loop instead of waiting out the backoff
#[tokio::test]
async fn test_cancelled_fetch_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let fetcher = ResourceFetcher::new(&FetchConfig::default())
        .unwrap()
        .with_retry(RetryConfig::with_delays(3, 60_000, 60_000))
        .with_cancellation(cancel);

    let resource = Resource::new(format!("{}/down", mock_server.uri()));
    let err = fetcher.fetch(&resource).await.unwrap_err();
    assert!(err.is_transient());
}

/// Test that server errors trigger retries
#[tokio::test]
async fn test_server_error_retry() {
    let mock_server = MockServer::start().await;

    // Return 503 twice, then succeed
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(3);
    let resource = Resource::new(format!("{}/flaky", mock_server.uri()));
    let bytes = fetcher.fetch(&resource).await;

    assert!(bytes.is_ok(), "Should succeed after retries: {:?}", bytes.err());
}

/// Test 404 does not retry
#[tokio::test]
async fn test_404_no_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1) // Should only be called once (no retry)
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(3);
    let resource = Resource::new(format!("{}/missing", mock_server.uri()));
    let err = fetcher.fetch(&resource).await.unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 404, .. }));
    assert!(!err.is_transient());
}

/// Test that 429 is treated as transient
#[tokio::test]
async fn test_rate_limited_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(2);
    let resource = Resource::new(format!("{}/busy", mock_server.uri()));
    let err = fetcher.fetch(&resource).await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.outcome(), FetchOutcome::TransientError);
}

/// Test reading a local file by bare path
#[tokio::test]
async fn test_local_file() {
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    write!(file, "plain notes").unwrap();

    let fetcher = fast_fetcher(0);
    let resource = Resource::new(file.path().to_string_lossy());
    let fetched = fetch_resource(&fetcher, &resource).await.unwrap();

    assert_eq!(fetched.bytes, b"plain notes");
    assert_eq!(fetched.content_type, ContentType::Text);
}

/// Test that unknown schemes fail without a network attempt
#[tokio::test]
async fn test_unsupported_scheme() {
    let fetcher = fast_fetcher(3);
    let err = fetcher
        .fetch(&Resource::new("gopher://example.test/1"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::UnsupportedScheme { ref scheme, .. } if scheme == "gopher"));
    assert_eq!(err.outcome(), FetchOutcome::UnsupportedScheme);
}

/// Test that an unreachable transfer host is a transient error
#[tokio::test]
async fn test_unreachable_transfer_host() {
    let fetcher = fast_fetcher(0);
    let err = fetcher
        .fetch(&Resource::new("ftp://127.0.0.1:1/file.txt"))
        .await
        .unwrap_err();

    assert_eq!(err.outcome(), FetchOutcome::TransientError);
}
