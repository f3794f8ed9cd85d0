//! Configuration loader: merges env vars, .env file, and config.toml.

use std::path::{Path, PathBuf};

use common::config::AppConfig;
use common::Error;
use tracing::{debug, warn};

fn parse_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn validate_config(config: &AppConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if !(2..=3).contains(&config.forecast_days) {
        issues.push("forecast_days must be 2 or 3".into());
    }
    let base = config.weather_api_base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        issues.push("weather_api_base_url must be an http(s) URL".into());
    }

    if config.timing.http_timeout_secs == 0 {
        issues.push("timing.http_timeout_secs must be > 0".into());
    }
    if config.timing.refresh_interval_secs > 0
        && config.timing.throttle_window_secs > config.timing.refresh_interval_secs
    {
        issues.push(
            "timing.throttle_window_secs must not exceed timing.refresh_interval_secs".into(),
        );
    }

    if config.storage.data_dir.as_os_str().is_empty() {
        issues.push("storage.data_dir must not be empty".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load configuration from environment and optional config file.
pub fn load_config(config_path: &Path) -> Result<AppConfig, Error> {
    // 1. Load .env file from the working directory or its parents.
    if let Err(e) = dotenvy::dotenv() {
        debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults, replaced by the config file if present.
    let mut config = AppConfig::default();
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        config = toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;
    }

    // 3. Override with environment variables (highest priority).
    if let Ok(key) = std::env::var("WEATHER_API_KEY") {
        config.weather_api_key = key.trim().to_string();
    }
    if let Ok(url) = std::env::var("WEATHER_API_BASE_URL") {
        config.weather_api_base_url = url.trim().to_string();
    }
    if let Ok(raw) = std::env::var("WEATHER_FORECAST_DAYS") {
        config.forecast_days = raw
            .trim()
            .parse::<u8>()
            .map_err(|_| Error::Config("WEATHER_FORECAST_DAYS must be 2 or 3".into()))?;
    }
    if let Ok(dir) = std::env::var("LIGHTHOUSE_DATA_DIR") {
        config.storage.data_dir = PathBuf::from(dir);
    }
    if let Ok(raw) = std::env::var("LIGHTHOUSE_REFRESH_INTERVAL_SECS") {
        config.timing.refresh_interval_secs =
            parse_u64(&raw, "LIGHTHOUSE_REFRESH_INTERVAL_SECS")?;
    }
    if let Ok(raw) = std::env::var("LIGHTHOUSE_THROTTLE_SECS") {
        config.timing.throttle_window_secs = parse_u64(&raw, "LIGHTHOUSE_THROTTLE_SECS")?;
    }
    if let Ok(raw) = std::env::var("LIGHTHOUSE_HTTP_TIMEOUT_SECS") {
        config.timing.http_timeout_secs = parse_u64(&raw, "LIGHTHOUSE_HTTP_TIMEOUT_SECS")?;
    }

    // 4. The key is only needed once something is fetched.
    if config.weather_api_key.is_empty() {
        warn!("WEATHER_API_KEY is not set; forecast fetches will fail and fall back to cache");
    }

    validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        validate_config(&AppConfig::default()).expect("defaults should validate");
    }

    #[test]
    fn test_validate_collects_every_issue() {
        let mut cfg = AppConfig::default();
        cfg.forecast_days = 7;
        cfg.weather_api_base_url = "ftp://example.com".into();
        cfg.timing.http_timeout_secs = 0;

        let err = validate_config(&cfg).unwrap_err().to_string();
        assert!(err.contains("forecast_days"), "{err}");
        assert!(err.contains("weather_api_base_url"), "{err}");
        assert!(err.contains("http_timeout_secs"), "{err}");
    }

    #[test]
    fn test_throttle_longer_than_refresh_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.timing.refresh_interval_secs = 30;
        cfg.timing.throttle_window_secs = 60;
        assert!(validate_config(&cfg).is_err());

        // A disabled timer puts no bound on the throttle.
        cfg.timing.refresh_interval_secs = 0;
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_parse_u64_reports_variable() {
        assert_eq!(parse_u64(" 90 ", "X").unwrap(), 90);
        let err = parse_u64("-1", "LIGHTHOUSE_THROTTLE_SECS").unwrap_err();
        assert!(err.to_string().contains("LIGHTHOUSE_THROTTLE_SECS"));
    }

    #[test]
    fn test_config_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "forecast_days = 2\n[timing]\nrefresh_interval_secs = 600\n[storage]\ndata_dir = \"/tmp/lh\"\n",
        )
        .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let cfg: AppConfig = toml::from_str(&contents).unwrap();
        assert_eq!(cfg.forecast_days, 2);
        assert_eq!(cfg.timing.refresh_interval_secs, 600);
        assert_eq!(cfg.timing.throttle_window_secs, 60);
        assert_eq!(cfg.storage.data_dir, PathBuf::from("/tmp/lh"));
        validate_config(&cfg).unwrap();
    }
}
