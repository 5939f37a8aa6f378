use anyhow::{Context, Result};

use sitewatch::config::Config;
use sitewatch::report::ReportKind;
use sitewatch::scheduler::generate_report;

use super::library_error;

/// Generate one report from the Change Log now
pub async fn report(config: Config, kind: ReportKind) -> Result<()> {
    let path = generate_report(
        kind,
        config.reports.clone(),
        config.monitor.change_log_file.clone(),
    )
    .await
    .map_err(library_error)
    .with_context(|| format!("Failed to generate {kind} report"))?;

    println!("{}", path.display());
    Ok(())
}
