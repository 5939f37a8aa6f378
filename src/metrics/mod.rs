//! Prometheus metrics for check cycles and on-demand checks
//!
//! Call `init_metrics()` at startup to register everything. If registration
//! fails, every recording function below becomes a no-op.

use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_int_gauge, Counter,
    CounterVec, Encoder, Histogram, IntGauge, TextEncoder,
};
use std::sync::OnceLock;

use crate::models::FetchOutcome;

// ============================================================================
// Metrics Storage
// ============================================================================

struct MonitorMetrics {
    checks: Counter,
    changes: Counter,
    fetch_failures: CounterVec,
    persistence_failures: CounterVec,
    cycle_duration: Histogram,
    tracked_resources: IntGauge,
    http_requests: CounterVec,
}

static MONITOR_METRICS: OnceLock<MonitorMetrics> = OnceLock::new();

static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Register all metrics with the default registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = MonitorMetrics {
        checks: register_counter!(
            "sitewatch_checks_total",
            "Total resource checks that produced a digest"
        )?,
        changes: register_counter!(
            "sitewatch_changes_total",
            "Total checks that detected changed content"
        )?,
        fetch_failures: register_counter_vec!(
            "sitewatch_fetch_failures_total",
            "Total failed checks by outcome",
            &["outcome"]
        )?,
        persistence_failures: register_counter_vec!(
            "sitewatch_persistence_failures_total",
            "Total failed saves by store",
            &["store"]
        )?,
        cycle_duration: register_histogram!(
            "sitewatch_cycle_duration_seconds",
            "Duration of a full check cycle in seconds",
            vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]
        )?,
        tracked_resources: register_int_gauge!(
            "sitewatch_tracked_resources",
            "Number of resources in the current tracked list"
        )?,
        http_requests: register_counter_vec!(
            "sitewatch_http_requests_total",
            "On-demand server requests by endpoint and status",
            &["endpoint", "status"]
        )?,
    };

    MONITOR_METRICS
        .set(metrics)
        .map_err(|_| "Monitor metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

pub fn metrics_initialized() -> bool {
    MONITOR_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a completed check
pub fn record_check(changed: bool) {
    let Some(m) = MONITOR_METRICS.get() else {
        return;
    };

    m.checks.inc();
    if changed {
        m.changes.inc();
    }
}

/// Record a failed check
pub fn record_fetch_failure(outcome: FetchOutcome) {
    if let Some(m) = MONITOR_METRICS.get() {
        m.fetch_failures.with_label_values(&[outcome.as_str()]).inc();
    }
}

/// Record a failed State Store or Change Log save
pub fn record_persistence_failure(store: &str) {
    if let Some(m) = MONITOR_METRICS.get() {
        m.persistence_failures.with_label_values(&[store]).inc();
    }
}

pub fn set_tracked_resources(count: usize) {
    if let Some(m) = MONITOR_METRICS.get() {
        m.tracked_resources.set(count as i64);
    }
}

/// Record one on-demand server request
pub fn record_http_request(endpoint: &str, status: u16) {
    if let Some(m) = MONITOR_METRICS.get() {
        let status_str = status.to_string();
        m.http_requests
            .with_label_values(&[endpoint, &status_str])
            .inc();
    }
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start timing a check cycle
pub fn start_cycle_timer() -> MetricsTimer {
    match MONITOR_METRICS.get() {
        Some(m) => MetricsTimer::new(m.cycle_duration.start_timer()),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ensure_metrics_initialized() {
        let _ = init_metrics();
    }

    #[test]
    fn test_init_metrics_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_encode_metrics() {
        ensure_metrics_initialized();
        record_check(true);
        record_fetch_failure(FetchOutcome::TransientError);

        let text = encode_metrics().unwrap();
        assert!(text.contains("sitewatch_checks_total"));
        assert!(text.contains("transient_error"));
    }

    #[test]
    fn test_recording_helpers() {
        ensure_metrics_initialized();
        record_check(false);
        record_persistence_failure("state");
        set_tracked_resources(3);
        record_http_request("/check", 200);
        let _timer = start_cycle_timer();
    }
}
