use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use sitewatch::config::Config;
use sitewatch::error::{Error, SitewatchErrorTrait};
use sitewatch::metrics;
use sitewatch::models::{FetchOutcome, Resource, ResourceState};
use sitewatch::pipeline::{CheckPipeline, CheckReport};
use sitewatch::storage::StateStore;

use super::{build_pipeline, init_metrics};

// ============================================================================
// On-demand Check Server
// ============================================================================

/// Shared state for the check server
struct ServerState {
    pipeline: CheckPipeline,
    state_file: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CheckParams {
    url: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    resource: Option<String>,
    error: String,
    outcome: Option<FetchOutcome>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            resource: None,
            error: error.into(),
            outcome: None,
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Start the on-demand check server
pub async fn serve(config: Config, host: String, port: u16) -> Result<()> {
    init_metrics();

    let shutdown = CancellationToken::new();
    let state = Arc::new(ServerState {
        pipeline: build_pipeline(&config, &shutdown)?,
        state_file: config.monitor.state_file.clone(),
    });
    let app = router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to {addr}"))?;

    println!("sitewatch server listening on http://{addr}");
    println!();
    println!("Endpoints:");
    println!("  GET /check?url=<resource> - Check one resource");
    println!("  GET /entities             - Persisted state");
    println!("  GET /health               - Health check");
    println!("  GET /metrics              - Prometheus metrics");
    println!();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                shutdown.cancel();
            }
        })
        .await
        .context("Server error")?;

    Ok(())
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/check", get(check_handler))
        .route("/entities", get(entities_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn load_state(path: &Path) -> Result<StateStore, ApiError> {
    StateStore::load(path).map_err(|e| {
        let err = Error::from(e);
        tracing::error!(
            category = err.category().as_str(),
            recoverable = err.is_recoverable(),
            error = %err,
            "Failed to read state file"
        );
        let status = if err.is_recoverable() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(ErrorResponse::new(err.to_string())))
    })
}

/// Run the check pipeline for one resource without persisting anything
async fn check_handler(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<CheckParams>,
) -> Result<Json<CheckReport>, ApiError> {
    let resource = Resource::new(params.url.unwrap_or_default());
    if resource.as_str().is_empty() {
        metrics::record_http_request("check", StatusCode::BAD_REQUEST.as_u16());
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Query parameter 'url' is required")),
        ));
    }

    let store = load_state(&state.state_file).inspect_err(|(status, _)| {
        metrics::record_http_request("check", status.as_u16());
    })?;

    match state.pipeline.check(&resource, store.digest(&resource)).await {
        Ok(report) => {
            metrics::record_http_request("check", StatusCode::OK.as_u16());
            Ok(Json(report))
        }
        Err(failure) => {
            metrics::record_http_request("check", StatusCode::BAD_GATEWAY.as_u16());
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    resource: Some(failure.resource.to_string()),
                    error: failure.error,
                    outcome: Some(failure.outcome),
                }),
            ))
        }
    }
}

/// Persisted State Store snapshot
async fn entities_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<BTreeMap<Resource, ResourceState>>, ApiError> {
    let store = load_state(&state.state_file).inspect_err(|(status, _)| {
        metrics::record_http_request("entities", status.as_u16());
    })?;
    metrics::record_http_request("entities", StatusCode::OK.as_u16());
    Ok(Json(store.entries().clone()))
}

async fn health_handler() -> Json<HealthResponse> {
    metrics::record_http_request("health", StatusCode::OK.as_u16());
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            e.to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use sitewatch::entities::NoopTagger;
    use sitewatch::fetcher::Fetch;
    use sitewatch::hasher::{ContentHasher, HashAlgorithm};
    use sitewatch::parser::ContentExtractor;
    use sitewatch::utils::error::FetchError;
    use tower::ServiceExt;

    struct PageFetch;

    #[async_trait]
    impl Fetch for PageFetch {
        async fn fetch(&self, resource: &Resource) -> Result<Vec<u8>, FetchError> {
            if resource.as_str().contains("down") {
                return Err(FetchError::Timeout {
                    url: resource.to_string(),
                });
            }
            Ok(b"<html><body><p>Hello there.</p></body></html>".to_vec())
        }
    }

    fn test_router(state_file: PathBuf) -> Router {
        let pipeline = CheckPipeline::new(
            Arc::new(PageFetch),
            Arc::new(ContentExtractor::new()),
            ContentHasher::new(HashAlgorithm::Sha256),
            Arc::new(NoopTagger),
        );
        router(Arc::new(ServerState {
            pipeline,
            state_file,
        }))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_check_reports_change_without_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("state.json");
        let app = test_router(state_file.clone());

        let (status, body) = get_json(app, "/check?url=http://example.test/a").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], true);
        assert_eq!(body["previous_digest"], serde_json::Value::Null);
        assert_eq!(body["content_type"], "html");
        assert!(!state_file.exists());
    }

    #[tokio::test]
    async fn test_check_requires_url() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path().join("state.json"));

        let (status, body) = get_json(app, "/check?url=%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("url"));
    }

    #[tokio::test]
    async fn test_check_fetch_failure_is_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path().join("state.json"));

        let (status, body) = get_json(app, "/check?url=http://down.test/").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["resource"], "http://down.test/");
        assert_eq!(body["outcome"], "transient_error");
    }

    #[tokio::test]
    async fn test_entities_returns_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("state.json");
        std::fs::write(
            &state_file,
            r#"{"http://example.test/a": {"digest": "abc", "entities": []}}"#,
        )
        .unwrap();
        let app = test_router(state_file);

        let (status, body) = get_json(app, "/entities").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["http://example.test/a"]["digest"], "abc");
    }

    #[tokio::test]
    async fn test_corrupt_state_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("state.json");
        std::fs::write(&state_file, "{ not json").unwrap();
        let app = test_router(state_file);

        let (status, body) = get_json(app, "/check?url=http://example.test/a").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("Corrupt"));
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path().join("state.json"));

        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }
}
