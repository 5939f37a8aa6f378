//! Configuration management for sitewatch
//!
//! Configuration comes from an optional TOML file, then `SITEWATCH_*`
//! environment overrides. Every section has defaults, so an empty or missing
//! file yields a runnable configuration. Validation happens once at startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::hasher::HashAlgorithm;
use crate::scheduler::trigger::{parse_time_of_day, parse_weekday};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracked list, state files and cycle cadence
    pub monitor: MonitorConfig,

    /// Fetch timeouts, identity and retry policy
    pub fetch: FetchConfig,

    /// Digest algorithm and size limits
    pub hashing: HashingConfig,

    /// Entity tagging
    pub entities: EntitiesConfig,

    /// Report generation
    pub reports: ReportsConfig,

    /// On-demand check server
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Monitor loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// JSON file with `{"sites": [...]}`
    pub sites_file: PathBuf,

    /// Persisted per-resource state
    pub state_file: PathBuf,

    /// Persisted change history
    pub change_log_file: PathBuf,

    /// Minutes between check cycles
    pub check_interval_minutes: u64,

    /// Resources processed concurrently within one cycle
    pub max_concurrent_checks: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sites_file: PathBuf::from("tracked_sites.json"),
            state_file: PathBuf::from("entity_store.json"),
            change_log_file: PathBuf::from("change_log.json"),
            check_interval_minutes: 30,
            max_concurrent_checks: 4,
        }
    }
}

/// Fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// User agent string
    pub user_agent: String,

    /// Extra attempts for transient failures
    pub max_retries: u32,

    pub retry_base_delay_ms: u64,

    pub retry_max_delay_ms: u64,

    /// Port used when an SFTP URL names none
    pub sftp_port: u16,

    /// User used when an SFTP URL names none
    pub sftp_default_user: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: format!("sitewatch/{}", env!("CARGO_PKG_VERSION")),
            max_retries: 2,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 10_000,
            sftp_port: 22,
            sftp_default_user: String::from("anonymous"),
        }
    }
}

/// Hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// `sha256`, `md5` or `blake3`
    pub algorithm: String,

    /// Hash only this many leading bytes
    pub initial_bytes: Option<usize>,

    /// Truncate content to this many binary megabytes before hashing
    pub max_size_mb: Option<usize>,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default().to_string(),
            initial_bytes: None,
            max_size_mb: None,
        }
    }
}

/// Entity tagging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitiesConfig {
    pub enabled: bool,

    /// Reference dictionary of people, organizations and publications
    pub reference_file: PathBuf,
}

impl Default for EntitiesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reference_file: PathBuf::from("fed_entities.json"),
        }
    }
}

/// Report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    pub output_dir: PathBuf,

    pub daily_enabled: bool,

    /// Local time of day, `HH:MM`
    pub daily_time: String,

    pub weekly_enabled: bool,

    /// Day name such as `Monday`
    pub weekly_day: String,

    /// Local time of day, `HH:MM`
    pub weekly_time: String,

    /// Handlebars template replacing the built-in daily layout
    pub daily_template: Option<PathBuf>,

    /// Handlebars template replacing the built-in weekly layout
    pub weekly_template: Option<PathBuf>,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            daily_enabled: true,
            daily_time: String::from("00:00"),
            weekly_enabled: false,
            weekly_day: String::from("Monday"),
            weekly_time: String::from("06:00"),
            daily_template: None,
            weekly_template: None,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 8000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` when given (it must exist), else from `sitewatch.toml`
    /// when present, else defaults. Environment overrides are applied and the
    /// result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new("sitewatch.toml");
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `SITEWATCH_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("SITEWATCH_SITES_FILE") {
            self.monitor.sites_file = v.into();
        }
        if let Ok(v) = std::env::var("SITEWATCH_STATE_FILE") {
            self.monitor.state_file = v.into();
        }
        if let Ok(v) = std::env::var("SITEWATCH_CHANGE_LOG_FILE") {
            self.monitor.change_log_file = v.into();
        }
        if let Some(v) = env_parse("SITEWATCH_CHECK_INTERVAL_MINUTES") {
            self.monitor.check_interval_minutes = v;
        }
        if let Some(v) = env_parse("SITEWATCH_MAX_CONCURRENT_CHECKS") {
            self.monitor.max_concurrent_checks = v;
        }
        if let Some(v) = env_parse("SITEWATCH_FETCH_TIMEOUT") {
            self.fetch.timeout_secs = v;
        }
        if let Ok(v) = std::env::var("SITEWATCH_USER_AGENT") {
            self.fetch.user_agent = v;
        }
        if let Some(v) = env_parse("SITEWATCH_MAX_RETRIES") {
            self.fetch.max_retries = v;
        }
        if let Ok(v) = std::env::var("SITEWATCH_HASH_ALGORITHM") {
            self.hashing.algorithm = v;
        }
        if let Some(v) = env_parse("SITEWATCH_HASH_INITIAL_BYTES") {
            self.hashing.initial_bytes = Some(v);
        }
        if let Some(v) = env_parse("SITEWATCH_HASH_MAX_SIZE_MB") {
            self.hashing.max_size_mb = Some(v);
        }
        if let Some(v) = env_parse("SITEWATCH_ENTITIES_ENABLED") {
            self.entities.enabled = v;
        }
        if let Ok(v) = std::env::var("SITEWATCH_ENTITIES_FILE") {
            self.entities.reference_file = v.into();
        }
        if let Ok(v) = std::env::var("SITEWATCH_REPORT_DIR") {
            self.reports.output_dir = v.into();
        }
        if let Ok(v) = std::env::var("SITEWATCH_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env_parse("SITEWATCH_PORT") {
            self.server.port = v;
        }
        if let Ok(v) = std::env::var("SITEWATCH_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("SITEWATCH_LOG_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.monitor.check_interval_minutes == 0 {
            anyhow::bail!("check_interval_minutes must be greater than 0");
        }

        if self.monitor.max_concurrent_checks == 0 {
            anyhow::bail!("max_concurrent_checks must be greater than 0");
        }

        if self.fetch.timeout_secs == 0 {
            anyhow::bail!("fetch timeout_secs must be greater than 0");
        }

        crate::hasher::ContentHasher::from_config(&self.hashing)
            .context("Invalid [hashing] configuration")?;

        parse_time_of_day(&self.reports.daily_time)
            .with_context(|| format!("Invalid daily_time: {}", self.reports.daily_time))?;
        parse_time_of_day(&self.reports.weekly_time)
            .with_context(|| format!("Invalid weekly_time: {}", self.reports.weekly_time))?;
        parse_weekday(&self.reports.weekly_day)
            .with_context(|| format!("Invalid weekly_day: {}", self.reports.weekly_day))?;

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging format must be 'text' or 'json'");
        }

        Ok(())
    }

    /// Get fetch timeout as Duration
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }

    /// Get check interval as Duration
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.check_interval_minutes * 60)
    }
}
