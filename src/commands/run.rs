use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use sitewatch::config::Config;
use sitewatch::scheduler::{generate_enabled_reports, Scheduler};

use super::{build_pipeline, init_metrics, library_error};

/// Start the scheduler, or run a single cycle with `once`
pub async fn run(config: Config, once: bool) -> Result<()> {
    init_metrics();

    let cancel = CancellationToken::new();
    let pipeline = build_pipeline(&config, &cancel)?;
    let mut scheduler = Scheduler::new(config.clone(), pipeline)
        .map_err(library_error)
        .context("Failed to start scheduler")?;

    tokio::spawn(wait_for_shutdown(cancel.clone()));

    if !once {
        scheduler.run(cancel).await;
        return Ok(());
    }

    let report = scheduler.run_once(&cancel).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    generate_enabled_reports(&config.reports, &config.monitor.change_log_file).await;

    if !report.persisted {
        anyhow::bail!("Cycle results could not be saved");
    }
    Ok(())
}

/// Cancel `token` on Ctrl-C or, on Unix, SIGTERM
async fn wait_for_shutdown(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}
