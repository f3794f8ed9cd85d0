//! Port for anything that can produce a forecast for a coordinate.

use async_trait::async_trait;

use crate::types::ForecastResponse;
use crate::Result;

/// A remote forecast provider.
///
/// Implementations issue exactly one request per call and propagate
/// failures unchanged; retry and cache fallback belong to the caller.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Fetch current conditions and a multi-day forecast for `(lat, lon)`.
    ///
    /// `label` is copied into [`ForecastResponse::label`] untouched.
    async fn fetch_forecast(
        &self,
        lat: f64,
        lon: f64,
        label: Option<&str>,
    ) -> Result<ForecastResponse>;
}
