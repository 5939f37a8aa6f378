use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use sitewatch::config::Config;
use sitewatch::models::Resource;
use sitewatch::storage::StateStore;

use super::{build_pipeline, library_error};

/// Check one resource against the persisted state and print the result.
///
/// Read-only: neither the State Store nor the Change Log is written.
pub async fn check(config: Config, resource: String) -> Result<()> {
    let resource = Resource::new(resource);
    if resource.as_str().is_empty() {
        anyhow::bail!("Resource must not be empty");
    }

    let store = StateStore::load(&config.monitor.state_file)
        .map_err(library_error)
        .with_context(|| {
            format!(
                "Failed to read state file: {}",
                config.monitor.state_file.display()
            )
        })?;
    let pipeline = build_pipeline(&config, &CancellationToken::new())?;

    match pipeline.check(&resource, store.digest(&resource)).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(failure) => {
            println!("{}", serde_json::to_string_pretty(&failure)?);
            anyhow::bail!("Check failed: {}", failure.error)
        }
    }
}
