//! Scheduler lifecycle tests with file-backed stores

use async_trait::async_trait;
use sitewatch::config::Config;
use sitewatch::entities::NoopTagger;
use sitewatch::fetcher::Fetch;
use sitewatch::hasher::{ContentHasher, HashAlgorithm};
use sitewatch::models::Resource;
use sitewatch::parser::ContentExtractor;
use sitewatch::pipeline::CheckPipeline;
use sitewatch::scheduler::{Scheduler, SchedulerError};
use sitewatch::utils::error::FetchError;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct EchoFetch;

#[async_trait]
impl Fetch for EchoFetch {
    async fn fetch(&self, resource: &Resource) -> Result<Vec<u8>, FetchError> {
        Ok(format!("<html><body><p>Page at {resource}</p></body></html>").into_bytes())
    }
}

/// Fires `cancel` on its first fetch, then finishes that fetch normally
struct CancellingFetch {
    cancel: CancellationToken,
}

#[async_trait]
impl Fetch for CancellingFetch {
    async fn fetch(&self, resource: &Resource) -> Result<Vec<u8>, FetchError> {
        self.cancel.cancel();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        Ok(format!("<html><body><p>Page at {resource}</p></body></html>").into_bytes())
    }
}

fn pipeline_with(fetcher: Arc<dyn Fetch>) -> CheckPipeline {
    CheckPipeline::new(
        fetcher,
        Arc::new(ContentExtractor::new()),
        ContentHasher::new(HashAlgorithm::Sha256),
        Arc::new(NoopTagger),
    )
}

fn pipeline() -> CheckPipeline {
    CheckPipeline::new(
        Arc::new(EchoFetch),
        Arc::new(ContentExtractor::new()),
        ContentHasher::new(HashAlgorithm::Sha256),
        Arc::new(NoopTagger),
    )
}

fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.monitor.sites_file = dir.join("sites.json");
    config.monitor.state_file = dir.join("state.json");
    config.monitor.change_log_file = dir.join("log.json");
    config.reports.output_dir = dir.join("reports");
    config
}

fn write_sites(dir: &Path, sites: &[&str]) {
    let body = serde_json::json!({ "sites": sites });
    std::fs::write(dir.join("sites.json"), body.to_string()).unwrap();
}

#[tokio::test]
async fn test_missing_sites_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = Scheduler::new(config_in(dir.path()), pipeline());
    assert!(matches!(result, Err(SchedulerError::SitesUnavailable { .. })));
}

#[tokio::test]
async fn test_run_once_then_reload() {
    let dir = tempfile::tempdir().unwrap();
    write_sites(dir.path(), &["http://a.test/", "http://b.test/", ""]);

    let mut scheduler = Scheduler::new(config_in(dir.path()), pipeline()).unwrap();
    assert_eq!(scheduler.sites().len(), 2);

    let cancel = CancellationToken::new();
    let first = scheduler.run_once(&cancel).await;
    assert_eq!(first.changed, 2);
    assert_eq!(scheduler.store().len(), 2);

    let second = scheduler.run_once(&cancel).await;
    assert_eq!(second.unchanged, 2);
    assert_eq!(scheduler.log().len(), 2);

    // A broken list keeps the previous one
    std::fs::write(dir.path().join("sites.json"), "{ broken").unwrap();
    scheduler.reload_sites();
    assert_eq!(scheduler.sites().len(), 2);

    write_sites(dir.path(), &["http://c.test/"]);
    scheduler.reload_sites();
    assert_eq!(scheduler.sites(), &[Resource::new("http://c.test/")]);

    // Entries for resources no longer tracked are kept
    let third = scheduler.run_once(&cancel).await;
    assert_eq!(third.changed, 1);
    assert_eq!(scheduler.store().len(), 3);
}

#[tokio::test]
async fn test_run_stops_on_cancel_and_writes_reports() {
    let dir = tempfile::tempdir().unwrap();
    write_sites(dir.path(), &["http://a.test/"]);
    let config = config_in(dir.path());

    let scheduler = Scheduler::new(config, pipeline()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    tokio::time::timeout(std::time::Duration::from_secs(10), scheduler.run(cancel))
        .await
        .expect("scheduler should stop after cancellation");

    assert!(dir.path().join("reports").join("daily_report.html").exists());
    assert!(!dir.path().join("reports").join("weekly_summary.html").exists());
}

#[tokio::test]
async fn test_cancelled_cycle_skips_everything() {
    let dir = tempfile::tempdir().unwrap();
    write_sites(dir.path(), &["http://a.test/", "http://b.test/"]);

    let mut scheduler = Scheduler::new(config_in(dir.path()), pipeline()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = scheduler.run_once(&cancel).await;
    assert!(report.cancelled);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.checked, 0);
    assert!(scheduler.store().is_empty());
}

#[tokio::test]
async fn test_cancel_mid_cycle_keeps_in_flight_result() {
    let dir = tempfile::tempdir().unwrap();
    write_sites(dir.path(), &["http://a.test/", "http://b.test/", "http://c.test/"]);
    let mut config = config_in(dir.path());
    config.monitor.max_concurrent_checks = 1;

    let cancel = CancellationToken::new();
    let fetcher = Arc::new(CancellingFetch {
        cancel: cancel.clone(),
    });
    let mut scheduler = Scheduler::new(config, pipeline_with(fetcher)).unwrap();

    let report = scheduler.run_once(&cancel).await;
    assert!(report.cancelled);
    assert!(report.persisted);
    assert_eq!(report.checked, 1);
    assert_eq!(report.changed, 1);
    assert_eq!(report.skipped, 2);

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("state.json")).unwrap())
            .unwrap();
    let keys: Vec<&String> = saved.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["http://a.test/"]);

    let log = sitewatch::storage::changelog::read_entries(&dir.path().join("log.json")).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].resource.as_str(), "http://a.test/");
}
