//! Check-cycle scheduling and report triggers
//!
//! # Overview
//!
//! [`Scheduler`] owns the State Store and Change Log for the lifetime of the
//! process. It runs one cycle immediately, then one per interval tick; a tick
//! that fires while a cycle is still running is skipped rather than queued,
//! so there is never more than one writer. Report triggers run on their own
//! task and only read the Change Log file.
//!
//! # Modules
//!
//! - [`cycle`] - one pass over the tracked resources
//! - [`sites`] - tracked resource list loading
//! - [`trigger`] - daily and weekly report fire times
//! - [`error`] - scheduler error types

pub mod cycle;
pub mod error;
pub mod sites;
pub mod trigger;

pub use cycle::{persist, run_cycle, CycleReport};
pub use error::{SchedulerError, SchedulerResult};
pub use sites::load_sites;
pub use trigger::{parse_time_of_day, parse_weekday, ReportSchedule};

use chrono::{Local, Utc};
use std::path::PathBuf;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, ReportsConfig};
use crate::metrics;
use crate::models::Resource;
use crate::pipeline::CheckPipeline;
use crate::report::{self, ReportKind};
use crate::storage::{ChangeLog, StateStore};

/// Drives repeated check cycles
pub struct Scheduler {
    config: Config,
    pipeline: CheckPipeline,
    store: StateStore,
    log: ChangeLog,
    sites: Vec<Resource>,
}

impl Scheduler {
    /// Load the tracked list and open both stores.
    ///
    /// # Errors
    ///
    /// Fails if the tracked list cannot be loaded or a store cannot be opened
    /// for writing. Nothing has been checked at that point.
    pub fn new(config: Config, pipeline: CheckPipeline) -> SchedulerResult<Self> {
        let sites = load_sites(&config.monitor.sites_file)?;
        let store = StateStore::open(&config.monitor.state_file)?;
        let log = ChangeLog::open(&config.monitor.change_log_file)?;

        info!(
            sites = sites.len(),
            known = store.len(),
            log_entries = log.len(),
            "Scheduler initialized"
        );
        metrics::set_tracked_resources(sites.len());

        Ok(Self {
            config,
            pipeline,
            store,
            log,
            sites,
        })
    }

    pub fn sites(&self) -> &[Resource] {
        &self.sites
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn log(&self) -> &ChangeLog {
        &self.log
    }

    /// Re-read the tracked list, keeping the current one on failure
    pub fn reload_sites(&mut self) {
        match load_sites(&self.config.monitor.sites_file) {
            Ok(sites) => {
                if sites.len() != self.sites.len() {
                    info!(previous = self.sites.len(), current = sites.len(), "Tracked list changed");
                }
                metrics::set_tracked_resources(sites.len());
                self.sites = sites;
            }
            Err(e) => {
                warn!(error = %e, kept = self.sites.len(), "Failed to reload tracked list; keeping previous list");
            }
        }
    }

    /// Run a single cycle over the current tracked list
    pub async fn run_once(&mut self, cancel: &CancellationToken) -> CycleReport {
        run_cycle(
            &self.pipeline,
            &self.sites,
            &mut self.store,
            &mut self.log,
            self.config.monitor.max_concurrent_checks,
            cancel,
        )
        .await
    }

    /// Run cycles until `cancel` fires, then persist and write final reports
    pub async fn run(mut self, cancel: CancellationToken) {
        let reports = tokio::spawn(run_report_loop(
            self.config.reports.clone(),
            self.config.monitor.change_log_file.clone(),
            cancel.clone(),
        ));

        let mut interval = tokio::time::interval(self.config.check_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut first = true;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    // The list loaded at startup is used for the first cycle
                    if !first {
                        self.reload_sites();
                    }
                    first = false;
                    self.run_once(&cancel).await;
                }
            }
        }

        info!("Shutting down scheduler");
        persist(&mut self.store, &mut self.log);

        if let Err(e) = reports.await {
            warn!(error = %e, "Report task ended abnormally");
        }
        generate_enabled_reports(&self.config.reports, &self.config.monitor.change_log_file).await;
    }
}

/// Generate one report on a blocking thread
pub async fn generate_report(
    kind: ReportKind,
    config: ReportsConfig,
    change_log: PathBuf,
) -> SchedulerResult<PathBuf> {
    tokio::task::spawn_blocking(move || report::generate(kind, &config, &change_log, Utc::now()))
        .await
        .map_err(|e| SchedulerError::ReportFailed {
            reason: e.to_string(),
        })?
        .map_err(|e| SchedulerError::ReportFailed {
            reason: e.to_string(),
        })
}

/// Generate every enabled report once
pub async fn generate_enabled_reports(config: &ReportsConfig, change_log: &std::path::Path) {
    let kinds = [
        (ReportKind::Daily, config.daily_enabled),
        (ReportKind::Weekly, config.weekly_enabled),
    ];
    for (kind, enabled) in kinds {
        if !enabled {
            continue;
        }
        if let Err(e) = generate_report(kind, config.clone(), change_log.to_path_buf()).await {
            error!(kind = %kind, error = %e, "Report generation failed");
        }
    }
}

fn configured_schedules(config: &ReportsConfig) -> Vec<(ReportKind, ReportSchedule)> {
    let mut schedules = Vec::new();
    if config.daily_enabled {
        match ReportSchedule::daily(&config.daily_time) {
            Ok(s) => schedules.push((ReportKind::Daily, s)),
            Err(e) => warn!(error = %e, "Daily report disabled"),
        }
    }
    if config.weekly_enabled {
        match ReportSchedule::weekly(&config.weekly_day, &config.weekly_time) {
            Ok(s) => schedules.push((ReportKind::Weekly, s)),
            Err(e) => warn!(error = %e, "Weekly report disabled"),
        }
    }
    schedules
}

/// Fire reports at their configured local times until `cancel` fires
pub async fn run_report_loop(config: ReportsConfig, change_log: PathBuf, cancel: CancellationToken) {
    let schedules = configured_schedules(&config);
    if schedules.is_empty() {
        return;
    }
    for (kind, schedule) in &schedules {
        info!(kind = %kind, schedule = %schedule, "Report trigger armed");
    }

    loop {
        let now = Local::now();
        let Some((kind, wait)) = schedules
            .iter()
            .map(|(kind, schedule)| (*kind, schedule.until_next(&now)))
            .min_by_key(|(_, wait)| *wait)
        else {
            return;
        };

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(wait) => {
                if let Err(e) = generate_report(kind, config.clone(), change_log.clone()).await {
                    error!(kind = %kind, error = %e, "Report generation failed");
                }
            }
        }
    }
}
