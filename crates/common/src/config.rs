//! Application configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// weatherapi.com API key. Only required once a forecast is fetched.
    #[serde(default)]
    pub weather_api_key: String,

    /// Base URL of the forecast API (no trailing slash).
    #[serde(default = "default_base_url")]
    pub weather_api_base_url: String,

    /// Number of forecast days to request (2 or 3).
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u8,

    /// Timing parameters (seconds).
    #[serde(default)]
    pub timing: TimingConfig,

    /// Local persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Timing configuration (all values in seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Interval between bulk refreshes of every lighthouse.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Minimum time between accepted throttled refreshes of one lighthouse.
    #[serde(default = "default_throttle_window")]
    pub throttle_window_secs: u64,

    /// Transport timeout for a single forecast request.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

/// Where the key-value store keeps its files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://api.weatherapi.com/v1".into()
}
fn default_forecast_days() -> u8 {
    3
}

fn default_refresh_interval() -> u64 {
    30 * 60
}
fn default_throttle_window() -> u64 {
    60
}
fn default_http_timeout() -> u64 {
    30
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("lighthouse-data")
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            throttle_window_secs: default_throttle_window(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            weather_api_key: String::new(),
            weather_api_base_url: default_base_url(),
            forecast_days: default_forecast_days(),
            timing: TimingConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_like_input_keeps_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"forecast_days": 2, "timing": {"throttle_window_secs": 5}}"#)
                .expect("partial config should deserialize");

        assert_eq!(cfg.forecast_days, 2);
        assert_eq!(cfg.timing.throttle_window_secs, 5);
        assert_eq!(cfg.timing.refresh_interval_secs, 1800);
        assert_eq!(cfg.weather_api_base_url, "https://api.weatherapi.com/v1");
        assert!(cfg.weather_api_key.is_empty());
    }
}
