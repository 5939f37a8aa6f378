//! Daily and weekly HTML reports built from the Change Log
//!
//! Reports only read the Change Log file; they never write it.

use chrono::{DateTime, Duration, Local, Utc};
use handlebars::Handlebars;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::ReportsConfig;
use crate::models::{ChangeLogEntry, EntityKind};
use crate::storage::changelog::read_entries;
use crate::storage::{write_atomic, StoreError};

const DAILY_TEMPLATE: &str = include_str!("../../templates/daily_report.hbs");
const WEEKLY_TEMPLATE: &str = include_str!("../../templates/weekly_summary.hbs");

/// Report errors
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid report template: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("Failed to render report: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("Report storage error: {0}")]
    Store(#[from] StoreError),
}

/// Which report to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Daily,
    Weekly,
}

impl ReportKind {
    pub fn window(&self) -> Duration {
        match self {
            Self::Daily => Duration::hours(24),
            Self::Weekly => Duration::days(7),
        }
    }

    /// How many entries each ranking keeps
    pub fn top_n(&self) -> usize {
        match self {
            Self::Daily => 10,
            Self::Weekly => 5,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Daily => "daily_report.html",
            Self::Weekly => "weekly_summary.html",
        }
    }

    fn template_name(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }

    fn window_label(&self) -> &'static str {
        match self {
            Self::Daily => "24 hours",
            Self::Weekly => "7 days",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template_name())
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// A name with its occurrence count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked {
    pub name: String,
    pub count: usize,
}

/// One change listed in a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRow {
    pub resource: String,
    pub time: String,
}

/// Aggregated Change Log data handed to the templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub kind: ReportKind,
    pub generated_at: String,
    pub window_label: &'static str,
    pub total_changes: usize,
    pub distinct_resources: usize,
    pub error_count: usize,
    pub changes: Vec<ChangeRow>,
    pub top_sites: Vec<Ranked>,
    pub people: Vec<Ranked>,
    pub organizations: Vec<Ranked>,
    pub publications: Vec<Ranked>,
    pub distinct_people: usize,
    pub distinct_organizations: usize,
    pub distinct_publications: usize,
}

/// Sort by count descending, then name, and count distinct keys
fn rank(counts: HashMap<String, usize>, limit: usize) -> (Vec<Ranked>, usize) {
    let distinct = counts.len();
    let mut ranked: Vec<Ranked> = counts
        .into_iter()
        .map(|(name, count)| Ranked { name, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    (ranked, distinct)
}

impl ReportSummary {
    /// Aggregate entries within the report window ending at `now`
    pub fn from_entries(entries: &[ChangeLogEntry], kind: ReportKind, now: DateTime<Utc>) -> Self {
        let cutoff = now - kind.window();
        let in_window = entries
            .iter()
            .filter(|e| e.timestamp > cutoff && e.timestamp <= now);

        let mut error_count = 0;
        let mut changes = Vec::new();
        let mut sites: HashMap<String, usize> = HashMap::new();
        let mut people: HashMap<String, usize> = HashMap::new();
        let mut organizations: HashMap<String, usize> = HashMap::new();
        let mut publications: HashMap<String, usize> = HashMap::new();

        for entry in in_window {
            if entry.is_error() {
                error_count += 1;
                continue;
            }
            if !entry.changed {
                continue;
            }

            changes.push(ChangeRow {
                resource: entry.resource.to_string(),
                time: entry
                    .timestamp
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
            });
            *sites.entry(entry.resource.to_string()).or_default() += 1;

            for entity in &entry.entities {
                let name = entity.full_name.clone().unwrap_or_else(|| entity.text.clone());
                let bucket = match entity.kind {
                    EntityKind::Person => &mut people,
                    EntityKind::Organization => &mut organizations,
                    EntityKind::Publication => &mut publications,
                };
                *bucket.entry(name).or_default() += 1;
            }
        }

        let limit = kind.top_n();
        let distinct_resources = sites.len();
        let (top_sites, _) = rank(sites, limit);
        let (people, distinct_people) = rank(people, limit);
        let (organizations, distinct_organizations) = rank(organizations, limit);
        let (publications, distinct_publications) = rank(publications, limit);

        Self {
            kind,
            generated_at: now
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            window_label: kind.window_label(),
            total_changes: changes.len(),
            distinct_resources,
            error_count,
            changes,
            top_sites,
            people,
            organizations,
            publications,
            distinct_people,
            distinct_organizations,
            distinct_publications,
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Handlebars renderer for both report kinds
pub struct ReportWriter<'a> {
    handlebars: Handlebars<'a>,
    output_dir: PathBuf,
}

impl<'a> ReportWriter<'a> {
    /// Built-in templates, replaced by any template files configured
    pub fn new(config: &ReportsConfig) -> Result<Self, ReportError> {
        let mut handlebars = Handlebars::new();
        handlebars.register_template_string(ReportKind::Daily.template_name(), DAILY_TEMPLATE)?;
        handlebars.register_template_string(ReportKind::Weekly.template_name(), WEEKLY_TEMPLATE)?;

        if let Some(path) = &config.daily_template {
            handlebars.register_template_file(ReportKind::Daily.template_name(), path)?;
        }
        if let Some(path) = &config.weekly_template {
            handlebars.register_template_file(ReportKind::Weekly.template_name(), path)?;
        }

        Ok(Self {
            handlebars,
            output_dir: config.output_dir.clone(),
        })
    }

    pub fn render(&self, summary: &ReportSummary) -> Result<String, ReportError> {
        Ok(self
            .handlebars
            .render(summary.kind.template_name(), summary)?)
    }

    /// Render and atomically write the report, returning its path
    pub fn write(&self, summary: &ReportSummary) -> Result<PathBuf, ReportError> {
        let html = self.render(summary)?;
        let path = self.output_dir.join(summary.kind.file_name());
        write_atomic(&path, html.as_bytes())?;
        tracing::info!(
            kind = %summary.kind,
            path = %path.display(),
            changes = summary.total_changes,
            "Report generated"
        );
        Ok(path)
    }
}

/// Build one report from the Change Log file at `change_log`
pub fn generate(
    kind: ReportKind,
    config: &ReportsConfig,
    change_log: &Path,
    now: DateTime<Utc>,
) -> Result<PathBuf, ReportError> {
    let entries = read_entries(change_log)?;
    let summary = ReportSummary::from_entries(&entries, kind, now);
    ReportWriter::new(config)?.write(&summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetchOutcome, MatchedEntity, Resource};

    fn entity(text: &str, kind: EntityKind) -> MatchedEntity {
        MatchedEntity {
            text: text.to_string(),
            kind,
            full_name: None,
            detail: None,
        }
    }

    fn change_at(resource: &str, at: DateTime<Utc>, entities: Vec<MatchedEntity>) -> ChangeLogEntry {
        let mut entry =
            ChangeLogEntry::change(Resource::new(resource), None, "d".to_string(), entities);
        entry.timestamp = at;
        entry
    }

    fn sample(now: DateTime<Utc>) -> Vec<ChangeLogEntry> {
        let mut failure = ChangeLogEntry::failure(
            Resource::new("ftp://down.test/file"),
            None,
            FetchOutcome::TransientError,
            "refused",
        );
        failure.timestamp = now - Duration::hours(1);

        vec![
            change_at(
                "http://a.test",
                now - Duration::hours(2),
                vec![entity("Powell", EntityKind::Person), entity("FOMC", EntityKind::Organization)],
            ),
            change_at(
                "http://a.test",
                now - Duration::hours(3),
                vec![entity("Powell", EntityKind::Person)],
            ),
            change_at(
                "http://b.test",
                now - Duration::days(3),
                vec![entity("Beige Book", EntityKind::Publication)],
            ),
            failure,
        ]
    }

    #[test]
    fn test_daily_window() {
        let now = Utc::now();
        let summary = ReportSummary::from_entries(&sample(now), ReportKind::Daily, now);

        assert_eq!(summary.total_changes, 2);
        assert_eq!(summary.distinct_resources, 1);
        assert_eq!(summary.error_count, 1);
        assert_eq!(
            summary.people,
            vec![Ranked {
                name: "Powell".to_string(),
                count: 2
            }]
        );
        assert!(summary.publications.is_empty());
    }

    #[test]
    fn test_weekly_window_and_top_sites() {
        let now = Utc::now();
        let summary = ReportSummary::from_entries(&sample(now), ReportKind::Weekly, now);

        assert_eq!(summary.total_changes, 3);
        assert_eq!(summary.distinct_resources, 2);
        assert_eq!(summary.top_sites[0].name, "http://a.test");
        assert_eq!(summary.top_sites[0].count, 2);
        assert_eq!(summary.distinct_publications, 1);
    }

    #[test]
    fn test_rankings_are_capped() {
        let now = Utc::now();
        let entries: Vec<_> = (0..8)
            .map(|i| change_at(&format!("http://site{i}.test"), now - Duration::hours(1), Vec::new()))
            .collect();

        let summary = ReportSummary::from_entries(&entries, ReportKind::Weekly, now);
        assert_eq!(summary.top_sites.len(), 5);
        assert_eq!(summary.distinct_resources, 8);
    }

    #[test]
    fn test_render_escapes_and_lists() {
        let now = Utc::now();
        let entries = vec![change_at("http://a.test/?q=<x>", now - Duration::hours(1), Vec::new())];
        let summary = ReportSummary::from_entries(&entries, ReportKind::Daily, now);

        let writer = ReportWriter::new(&ReportsConfig::default()).unwrap();
        let html = writer.render(&summary).unwrap();
        assert!(html.contains("&lt;x&gt;"));
        assert!(html.contains("No people mentioned in the last 24 hours."));
    }

    #[test]
    fn test_generate_reads_log_and_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("change_log.json");
        let now = Utc::now();
        crate::storage::write_json_atomic(&log_path, &sample(now)).unwrap();
        let before = std::fs::read(&log_path).unwrap();

        let config = ReportsConfig {
            output_dir: dir.path().to_path_buf(),
            ..ReportsConfig::default()
        };
        let path = generate(ReportKind::Weekly, &config, &log_path, now).unwrap();

        assert_eq!(path, dir.path().join("weekly_summary.html"));
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("http://a.test"));
        assert_eq!(std::fs::read(&log_path).unwrap(), before);
    }

    #[test]
    fn test_template_override() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("daily.hbs");
        std::fs::write(&template, "changes={{total_changes}}").unwrap();

        let config = ReportsConfig {
            output_dir: dir.path().to_path_buf(),
            daily_template: Some(template),
            ..ReportsConfig::default()
        };
        let summary = ReportSummary::from_entries(&[], ReportKind::Daily, Utc::now());
        let html = ReportWriter::new(&config).unwrap().render(&summary).unwrap();
        assert_eq!(html, "changes=0");
    }
}
