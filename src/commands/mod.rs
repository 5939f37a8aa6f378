pub mod check;
pub mod report;
pub mod run;
pub mod serve;

// Re-export command functions for convenience
pub use check::check;
pub use report::report;
pub use run::run;
pub use serve::serve;

use anyhow::{Context, Result};
use sitewatch::config::Config;
use sitewatch::error::{Error, SitewatchErrorTrait};
use sitewatch::pipeline::CheckPipeline;
use tokio_util::sync::CancellationToken;

/// Build the check pipeline shared by every command
pub(crate) fn build_pipeline(config: &Config, cancel: &CancellationToken) -> Result<CheckPipeline> {
    CheckPipeline::from_config_until(config, cancel.clone())
        .map_err(library_error)
        .context("Failed to build check pipeline")
}

/// Log a library error with its category, then hand it to anyhow
pub(crate) fn library_error(err: impl Into<Error>) -> anyhow::Error {
    let err = err.into();
    tracing::error!(
        category = err.category().as_str(),
        recoverable = err.is_recoverable(),
        error = %err,
        "Operation failed"
    );
    anyhow::Error::new(err)
}

/// Register metrics, logging instead of failing when registration is refused
pub(crate) fn init_metrics() {
    if let Err(e) = sitewatch::metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics disabled");
    }
}
