//! Integration tests for engine configuration resolution
//!
//! Config file → TomlConfig → EngineConfig, with the backend URL env override.

use annota_common::config::{load_config, write_toml_config, TomlConfig, CONFIG_ENV_VAR};
use annota_engine::config::BACKEND_URL_ENV_VAR;
use annota_engine::EngineConfig;
use serial_test::serial;
use std::time::Duration;
use tempfile::TempDir;

fn clear_env() {
    std::env::remove_var(CONFIG_ENV_VAR);
    std::env::remove_var(BACKEND_URL_ENV_VAR);
}

#[test]
#[serial]
fn tc_cfg_001_file_values_flow_into_engine_config() {
    // Given: a config file with custom timings and backend
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("annota.toml");
    std::fs::write(
        &path,
        r#"
backend_url = "http://labeling.internal/api"

[timing]
job_poll_interval_ms = 1500
job_poll_max_attempts = 40
search_debounce_ms = 150

[search]
min_query_len = 3
"#,
    )
    .unwrap();

    // When: loaded through the CLI path
    let config = EngineConfig::from_toml(&load_config(Some(&path)).unwrap());

    // Then: overrides applied, unspecified values defaulted
    assert_eq!(config.backend_url, "http://labeling.internal/api");
    assert_eq!(config.orchestrator.poll_interval, Duration::from_millis(1500));
    assert_eq!(config.orchestrator.max_poll_attempts, 40);
    assert_eq!(config.labeling.search.debounce, Duration::from_millis(150));
    assert_eq!(config.labeling.search.min_query_len, 3);
    assert_eq!(config.labeling.submit_throttle, Duration::from_secs(1));
    assert_eq!(config.active_job_poll_interval, Duration::from_secs(5));
}

#[test]
#[serial]
fn tc_cfg_002_env_backend_url_overrides_file() {
    // Given: backend URL in both file and environment
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("annota.toml");
    let mut toml_config = TomlConfig::default();
    toml_config.backend_url = Some("http://from-file/api".to_string());
    write_toml_config(&toml_config, &path).unwrap();
    std::env::set_var(BACKEND_URL_ENV_VAR, "http://from-env/api");

    // When: resolved
    let config = EngineConfig::from_toml(&load_config(Some(&path)).unwrap());
    clear_env();

    // Then: environment wins
    assert_eq!(config.backend_url, "http://from-env/api");
}

#[test]
#[serial]
fn tc_cfg_003_zero_event_bus_capacity_clamped() {
    // Given: an unusable channel capacity
    clear_env();
    let mut toml_config = TomlConfig::default();
    toml_config.event_bus_capacity = 0;

    // Then: the engine still gets a usable bus
    assert_eq!(EngineConfig::from_toml(&toml_config).event_bus_capacity, 1);
}
