//! Engine configuration resolved from the TOML file and environment
//!
//! Backend URL priority: `ANNOTA_BACKEND_URL` → TOML `backend_url` → default.

use crate::labeling::LabelingSettings;
use crate::orchestrator::OrchestratorSettings;
use crate::selection::SearchSettings;
use annota_common::config::{TomlConfig, DEFAULT_BACKEND_URL};
use std::time::Duration;
use tracing::{info, warn};

/// Environment override for the backend base URL
pub const BACKEND_URL_ENV_VAR: &str = "ANNOTA_BACKEND_URL";

/// Runtime configuration of the engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub backend_url: String,
    pub log_level: String,
    pub orchestrator: OrchestratorSettings,
    pub labeling: LabelingSettings,
    pub active_job_poll_interval: Duration,
    pub refresh_interval: Duration,
    pub event_bus_capacity: usize,
}

impl EngineConfig {
    pub fn from_toml(toml_config: &TomlConfig) -> Self {
        let timing = &toml_config.timing;
        Self {
            backend_url: resolve_backend_url(toml_config),
            log_level: toml_config.logging.level.clone(),
            orchestrator: OrchestratorSettings {
                poll_interval: Duration::from_millis(timing.job_poll_interval_ms),
                max_poll_attempts: timing.job_poll_max_attempts,
            },
            labeling: LabelingSettings {
                search: SearchSettings {
                    debounce: Duration::from_millis(timing.search_debounce_ms),
                    min_query_len: toml_config.search.min_query_len,
                },
                submit_throttle: Duration::from_millis(timing.submit_throttle_ms),
            },
            active_job_poll_interval: Duration::from_millis(timing.active_job_poll_interval_ms),
            refresh_interval: Duration::from_millis(timing.refresh_interval_ms),
            event_bus_capacity: toml_config.event_bus_capacity.max(1),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default())
    }
}

/// Resolve the backend base URL
///
/// **Priority:** ENV → TOML → compiled default
pub fn resolve_backend_url(toml_config: &TomlConfig) -> String {
    let env_url = std::env::var(BACKEND_URL_ENV_VAR)
        .ok()
        .filter(|url| !url.trim().is_empty());
    let toml_url = toml_config
        .backend_url
        .clone()
        .filter(|url| !url.trim().is_empty());

    if let (Some(_), Some(_)) = (&env_url, &toml_url) {
        warn!(
            "Backend URL found in multiple sources: environment, TOML. Using environment (highest priority)."
        );
    }

    if let Some(url) = env_url {
        info!("Backend URL loaded from environment variable");
        return url;
    }
    if let Some(url) = toml_url {
        info!("Backend URL loaded from TOML config");
        return url;
    }

    info!("Backend URL not configured, using default {}", DEFAULT_BACKEND_URL);
    DEFAULT_BACKEND_URL.to_string()
}
