//! weatherapi.com forecast client.
//!
//! Fetches current conditions plus a short marine forecast (tides, waves)
//! for a coordinate and returns it as the shared `ForecastResponse`.

use std::time::Duration;

use async_trait::async_trait;
use common::{Error, ForecastResponse, ForecastSource};
use tracing::debug;

const MAX_ERROR_BODY: usize = 500;

/// weatherapi.com client with connection pooling.
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    days: u8,
}

/// Query parameters for `/forecast.json`.
pub fn forecast_query(api_key: &str, lat: f64, lon: f64, days: u8) -> Vec<(&'static str, String)> {
    vec![
        ("key", api_key.to_string()),
        ("q", format!("{lat},{lon}")),
        ("days", days.to_string()),
        ("aqi", "no".to_string()),
        ("alerts", "no".to_string()),
        ("tide", "yes".to_string()),
        ("marine", "yes".to_string()),
    ]
}

impl WeatherApiClient {
    /// Build a client. An empty `api_key` is accepted here; fetches then
    /// fail with [`Error::Config`].
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        days: u8,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent("lighthouse-watch/0.1")
            .pool_max_idle_per_host(4)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build weatherapi HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            days,
        })
    }

    /// Build a client from application config.
    pub fn from_config(cfg: &common::AppConfig) -> Result<Self, Error> {
        Self::new(
            cfg.weather_api_key.clone(),
            cfg.weather_api_base_url.clone(),
            cfg.forecast_days,
            Duration::from_secs(cfg.timing.http_timeout_secs),
        )
    }

    fn forecast_url(&self) -> String {
        format!("{}/forecast.json", self.base_url)
    }

    /// Fetch the forecast for a coordinate, tagging the result with `label`.
    pub async fn get_forecast(
        &self,
        lat: f64,
        lon: f64,
        label: Option<&str>,
    ) -> Result<ForecastResponse, Error> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config(
                "weather API key is not defined (set WEATHER_API_KEY or weather_api_key in config.toml)"
                    .into(),
            ));
        }

        let url = self.forecast_url();
        debug!("Fetching forecast: {} lat={} lon={} days={}", url, lat, lon, self.days);

        let resp = self
            .client
            .get(&url)
            .query(&forecast_query(&self.api_key, lat, lon, self.days))
            .send()
            .await
            .map_err(|e| Error::Http(format!("HTTP error for ({lat},{lon}): {e}")))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::WeatherApi {
                status,
                message: truncate(&body, MAX_ERROR_BODY).to_string(),
            });
        }

        let mut forecast: ForecastResponse = resp
            .json()
            .await
            .map_err(|e| Error::Http(format!("JSON parse error for ({lat},{lon}): {e}")))?;

        debug!(
            "Got {} forecast days for ({},{})",
            forecast.forecast.forecastday.len(),
            lat,
            lon
        );

        forecast.label = label.map(str::to_string);
        Ok(forecast)
    }
}

#[async_trait]
impl ForecastSource for WeatherApiClient {
    async fn fetch_forecast(
        &self,
        lat: f64,
        lon: f64,
        label: Option<&str>,
    ) -> Result<ForecastResponse, Error> {
        self.get_forecast(lat, lon, label).await
    }
}

/// Cut `body` to at most `max` bytes without splitting a character.
fn truncate(body: &str, max: usize) -> &str {
    if body.len() <= max {
        return body;
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
