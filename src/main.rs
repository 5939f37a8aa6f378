use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitewatch::config::Config;
use sitewatch::report::ReportKind;

mod commands;

#[derive(Parser)]
#[command(
    name = "sitewatch",
    version,
    about = "Monitor web pages, local files and SFTP files for content changes",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./sitewatch.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides [logging] format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run check cycles on the configured interval
    Run {
        /// Run a single cycle, write enabled reports and exit
        #[arg(long, default_value = "false")]
        once: bool,
    },

    /// Check one resource now and print the result as JSON
    Check {
        /// URL, file path or sftp:// location
        resource: String,
    },

    /// Generate a report from the Change Log now
    Report {
        #[arg(value_enum)]
        kind: ReportArg,
    },

    /// Serve on-demand checks over HTTP
    Serve {
        /// Host to bind (overrides [server] host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportArg {
    Daily,
    Weekly,
}

impl From<ReportArg> for ReportKind {
    fn from(arg: ReportArg) -> Self {
        match arg {
            ReportArg::Daily => ReportKind::Daily,
            ReportArg::Weekly => ReportKind::Weekly,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Tracing needs the log settings, so a bad config is reported after setup
    let config = Config::load(cli.config.as_deref());
    let (level, config_format) = match &config {
        Ok(c) => (c.logging.level.clone(), c.logging.format.clone()),
        Err(_) => ("info".to_string(), "text".to_string()),
    };
    let format = cli.log_format.unwrap_or(config_format);
    setup_tracing(&format, &level, cli.verbose)?;

    let config = config?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sitewatch starting");

    match cli.command {
        Commands::Run { once } => {
            tracing::info!(
                once = %once,
                sites_file = %config.monitor.sites_file.display(),
                interval_minutes = config.monitor.check_interval_minutes,
                "Starting run command"
            );
            commands::run(config, once).await?;
        }

        Commands::Check { resource } => {
            tracing::info!(resource = %resource, "Starting check command");
            commands::check(config, resource).await?;
        }

        Commands::Report { kind } => {
            let kind = ReportKind::from(kind);
            tracing::info!(kind = %kind, "Starting report command");
            commands::report(config, kind).await?;
        }

        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            tracing::info!(host = %host, port = %port, "Starting serve command");
            commands::serve(config, host, port).await?;
        }
    }

    tracing::info!("sitewatch completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            tracing_subscriber::EnvFilter::new("sitewatch=debug,info")
        } else {
            tracing_subscriber::EnvFilter::new(format!("sitewatch={level},warn"))
        }
    });

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
