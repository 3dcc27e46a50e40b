//! Configuration loading and config file resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `ANNOTA_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/annota/annota.toml` on Linux)
//! 4. Compiled defaults (no file)
//!
//! A missing config file is never fatal: defaults are used and a warning logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ANNOTA_CONFIG";

/// Default backend base URL
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000/api";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Timers and poll budgets (milliseconds unless noted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Interval between status polls of one AI job
    pub job_poll_interval_ms: u64,
    /// Poll attempts before a job is considered timed out (count)
    pub job_poll_max_attempts: u32,
    /// Interval of the background active-job poller
    pub active_job_poll_interval_ms: u64,
    /// Interval of the general record-list refresh
    pub refresh_interval_ms: u64,
    /// Search-as-you-type debounce
    pub search_debounce_ms: u64,
    /// Window in which a repeated submit/skip/flag is rejected
    pub submit_throttle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            job_poll_interval_ms: 3_000,
            job_poll_max_attempts: 200,
            active_job_poll_interval_ms: 5_000,
            refresh_interval_ms: 30_000,
            search_debounce_ms: 300,
            submit_throttle_ms: 1_000,
        }
    }
}

/// Search behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Queries shorter than this (in chars) never reach the lookup service
    pub min_query_len: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { min_query_len: 2 }
    }
}

/// TOML configuration file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Base URL of the labeling backend
    pub backend_url: Option<String>,
    pub logging: LoggingConfig,
    pub timing: TimingConfig,
    pub search: SearchConfig,
    /// EventBus channel capacity
    pub event_bus_capacity: usize,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            logging: LoggingConfig::default(),
            timing: TimingConfig::default(),
            search: SearchConfig::default(),
            event_bus_capacity: 100,
        }
    }
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("annota").join("annota.toml"))
}

/// Resolve which config file to read, if any
///
/// An explicit CLI or environment path is returned even if it does not exist
/// (so the caller can report it); the platform default only if it exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|p| p.exists())
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load configuration with graceful degradation
///
/// A missing file yields defaults with a warning; a malformed file is an error.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            let config = load_toml_config(&path)?;
            info!("Configuration loaded from {}", path.display());
            Ok(config)
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            info!("No config file found, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Write a config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
