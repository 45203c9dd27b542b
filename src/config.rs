use std::path::Path;

use chrono::FixedOffset;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::display::DisplayZone;
use crate::error::{LeadError, Result};

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where leads come from
    pub backend: BackendConfig,
    /// How the snapshot stays current
    pub sync: SyncConfig,
    /// Log level, format and optional file
    pub logging: LoggingConfig,
    /// Presentation settings
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
/// Hosted backend settings
pub struct BackendConfig {
    /// Project URL; the REST path is appended
    pub url: String,
    /// Anonymous API key, sent as `apikey` and bearer token
    pub api_key: String,
    /// Lead table name
    pub table: String,
    /// Bulk fetch deadline
    pub fetch_timeout_secs: u64,
    /// Read rows from this JSON file instead of the backend
    pub snapshot_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
/// Live-update settings
pub struct SyncConfig {
    /// "poll", "push" or "static"
    pub strategy: String,
    /// Seconds between re-fetches for the poll strategy
    pub poll_interval_secs: u64,
    /// Change events buffered by push feeds
    pub feed_buffer: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
/// Logging settings
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Daily-rolling JSON log file
    pub file_path: Option<String>,
    /// "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
/// Presentation settings
pub struct DashboardConfig {
    /// Cap on finder results
    pub finder_limit: usize,
    /// "local", "utc" or a fixed offset such as "-03:00"
    pub timezone: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            table: "Retell_Leads".to_string(),
            fetch_timeout_secs: 30,
            snapshot_file: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { strategy: "poll".to_string(), poll_interval_secs: 30, feed_buffer: 256 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file_path: None, format: "text".to_string() }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { finder_limit: 10, timezone: "local".to_string() }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        Self::build(None)
    }

    /// Load configuration, layering an explicit file over the default search path
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::build(Some(path))
    }

    fn build(extra: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            // Start with default values
            .set_default("backend.url", defaults.backend.url)?
            .set_default("backend.api_key", defaults.backend.api_key)?
            .set_default("backend.table", defaults.backend.table)?
            .set_default("backend.fetch_timeout_secs", to_i64(defaults.backend.fetch_timeout_secs))?
            .set_default("sync.strategy", defaults.sync.strategy)?
            .set_default("sync.poll_interval_secs", to_i64(defaults.sync.poll_interval_secs))?
            .set_default("sync.feed_buffer", to_i64(defaults.sync.feed_buffer as u64))?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .set_default("dashboard.finder_limit", to_i64(defaults.dashboard.finder_limit as u64))?
            .set_default("dashboard.timezone", defaults.dashboard.timezone)?
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("lead-dashboard").required(false));

        if let Some(path) = extra {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // Add environment variables with prefix, e.g. LEAD_DASHBOARD_BACKEND__URL
            .add_source(Environment::with_prefix("LEAD_DASHBOARD").prefix_separator("_").separator("__"))
            .build()
            .map_err(|e| LeadError::InvalidConfig(format!("Failed to load configuration: {e}")))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| LeadError::InvalidConfig(format!("Failed to deserialize configuration: {e}")))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate backend config
        if self.backend.fetch_timeout_secs == 0 {
            return Err(LeadError::InvalidConfig("fetch_timeout_secs must be greater than 0".into()));
        }
        let url = self.backend.url.trim();
        if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(LeadError::InvalidConfig(format!("backend url must be http(s): {url}")));
        }
        if self.backend.table.trim().is_empty() {
            return Err(LeadError::InvalidConfig("backend table must not be empty".into()));
        }

        // Validate sync config
        let valid_strategies = ["poll", "push", "static"];
        if !valid_strategies.contains(&self.sync.strategy.as_str()) {
            return Err(LeadError::InvalidConfig(format!(
                "Invalid sync strategy: {}. Must be one of: {valid_strategies:?}",
                self.sync.strategy
            )));
        }
        if self.sync.poll_interval_secs == 0 {
            return Err(LeadError::InvalidConfig("poll_interval_secs must be greater than 0".into()));
        }
        if self.sync.feed_buffer == 0 {
            return Err(LeadError::InvalidConfig("feed_buffer must be greater than 0".into()));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(LeadError::InvalidConfig(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                self.logging.level
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(LeadError::InvalidConfig(format!(
                "Invalid log format: {}. Must be one of: {valid_formats:?}",
                self.logging.format
            )));
        }

        // Validate dashboard config
        if self.dashboard.finder_limit == 0 {
            return Err(LeadError::InvalidConfig("finder_limit must be greater than 0".into()));
        }
        self.dashboard.display_zone()?;

        Ok(())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

impl DashboardConfig {
    /// Zone used for calendar days, hours and weekdays
    pub fn display_zone(&self) -> Result<DisplayZone> {
        parse_timezone(&self.timezone)
    }
}

/// Parse "local", "utc"/"Z" or a fixed offset such as "-03:00"
pub fn parse_timezone(value: &str) -> Result<DisplayZone> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("local") {
        return Ok(DisplayZone::Local);
    }
    if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
        return Ok(DisplayZone::utc());
    }
    trimmed
        .parse::<FixedOffset>()
        .map(DisplayZone::Fixed)
        .map_err(|e| LeadError::InvalidConfig(format!("Invalid timezone {trimmed}: {e}")))
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
