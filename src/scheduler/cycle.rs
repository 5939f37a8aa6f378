//! One check cycle over the tracked resources

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::models::{ChangeLogEntry, Resource, ResourceState};
use crate::pipeline::{CheckOutcome, CheckPipeline, CheckReport};
use crate::storage::{ChangeLog, StateStore};

/// Summary of one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub checked: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub errors: usize,
    /// Resources not started because of cancellation
    pub skipped: usize,
    pub cancelled: bool,
    /// False if the State Store or Change Log could not be saved
    pub persisted: bool,
}

fn state_from_report(report: &CheckReport) -> ResourceState {
    ResourceState {
        digest: report.current_digest.clone(),
        algorithm: Some(report.algorithm),
        updated_at: Some(report.checked_at),
        entities: report.entities.clone(),
    }
}

/// Check every resource, merge results in list order, then persist.
///
/// At most `concurrency` checks run at once. Once `cancel` fires, checks that
/// have not started are skipped while in-flight ones finish.
pub async fn run_cycle(
    pipeline: &CheckPipeline,
    resources: &[Resource],
    store: &mut StateStore,
    log: &mut ChangeLog,
    concurrency: usize,
    cancel: &CancellationToken,
) -> CycleReport {
    let cycle_id = Uuid::new_v4();
    let started_at = Utc::now();
    let _timer = metrics::start_cycle_timer();

    info!(%cycle_id, resources = resources.len(), "Starting check cycle");

    let jobs: Vec<(usize, &Resource, Option<String>)> = resources
        .iter()
        .enumerate()
        .map(|(i, r)| (i, r, store.digest(r).map(str::to_string)))
        .collect();

    let mut results: Vec<(usize, Option<CheckOutcome>)> = stream::iter(jobs)
        .map(|(i, resource, previous)| async move {
            if cancel.is_cancelled() {
                return (i, None);
            }
            (i, Some(pipeline.check(resource, previous.as_deref()).await))
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    results.sort_by_key(|(i, _)| *i);

    let mut report = CycleReport {
        cycle_id,
        started_at,
        finished_at: started_at,
        checked: 0,
        changed: 0,
        unchanged: 0,
        errors: 0,
        skipped: 0,
        cancelled: cancel.is_cancelled(),
        persisted: true,
    };

    for (i, outcome) in results {
        let resource = &resources[i];
        match outcome {
            None => report.skipped += 1,
            Some(Ok(check)) if check.changed => {
                report.checked += 1;
                report.changed += 1;
                info!(resource = %resource, digest = %check.current_digest, "Content changed");
                store.update(resource.clone(), state_from_report(&check));
                log.append(ChangeLogEntry::change(
                    resource.clone(),
                    check.previous_digest,
                    check.current_digest,
                    check.entities,
                ));
            }
            Some(Ok(_)) => {
                report.checked += 1;
                report.unchanged += 1;
            }
            Some(Err(failure)) => {
                report.checked += 1;
                report.errors += 1;
                log.append(ChangeLogEntry::failure(
                    resource.clone(),
                    store.digest(resource).map(str::to_string),
                    failure.outcome,
                    failure.error,
                ));
            }
        }
    }

    report.persisted = persist(store, log);
    report.finished_at = Utc::now();

    if report.cancelled {
        warn!(%cycle_id, skipped = report.skipped, "Check cycle cancelled");
    }
    info!(
        %cycle_id,
        checked = report.checked,
        changed = report.changed,
        unchanged = report.unchanged,
        errors = report.errors,
        skipped = report.skipped,
        duration_ms = (report.finished_at - report.started_at).num_milliseconds(),
        "Check cycle finished"
    );
    report
}

/// Save both stores. Failures are logged and the data stays in memory for
/// the next attempt.
pub fn persist(store: &mut StateStore, log: &mut ChangeLog) -> bool {
    let mut ok = true;

    if let Err(e) = store.save() {
        error!(error = %e, "CRITICAL: failed to save state store; will retry");
        metrics::record_persistence_failure("state");
        ok = false;
    }

    if let Err(e) = log.save() {
        error!(
            error = %e,
            pending = log.pending(),
            "CRITICAL: failed to save change log; will retry"
        );
        metrics::record_persistence_failure("change_log");
        ok = false;
    }

    ok
}
