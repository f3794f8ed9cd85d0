//! Domain types shared across the workspace.

use serde::{Deserialize, Serialize};

// ── Lighthouse Types ──────────────────────────────────────────────────

/// A lighthouse as stored in the bundled list and the `lighthouses` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LighthouseRecord {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Latitude", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "Elevation", default)]
    pub elevation: Option<f64>,
}

/// A catalog entry as used inside the app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lighthouse {
    pub id: String,
    pub name: String,
    pub description: String,
    /// 0.0 when the source record has no position.
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
}

impl From<LighthouseRecord> for Lighthouse {
    fn from(record: LighthouseRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.name,
            description: record.description.unwrap_or_default(),
            lat: record.latitude.unwrap_or(0.0),
            lon: record.longitude.unwrap_or(0.0),
            elevation: record.elevation,
        }
    }
}

impl Lighthouse {
    /// Case-insensitive substring match against the display name.
    ///
    /// `needle` must already be trimmed and lower-cased.
    pub fn name_matches(&self, needle: &str) -> bool {
        needle.is_empty() || self.name.to_lowercase().contains(needle)
    }
}

// ── Forecast Types ────────────────────────────────────────────────────

/// Response body of weatherapi.com `/forecast.json`.
///
/// Every field tolerates absence so partial or cached payloads still decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastResponse {
    /// Display label attached by the gateway (usually the lighthouse name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<CurrentConditions>,
    pub forecast: ForecastDays,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub name: String,
    pub region: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub tz_id: String,
    pub localtime_epoch: i64,
    pub localtime: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    pub text: String,
    pub icon: String,
    pub code: i64,
}

/// The "right now" snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentConditions {
    pub last_updated: String,
    pub temp_c: f64,
    pub feelslike_c: f64,
    pub wind_kph: f64,
    pub wind_degree: f64,
    pub wind_dir: String,
    pub humidity: f64,
    pub vis_km: f64,
    pub condition: Condition,
}

impl CurrentConditions {
    /// Wind speed converted to metres per second.
    pub fn wind_ms(&self) -> f64 {
        self.wind_kph / 3.6
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastDays {
    pub forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastDay {
    pub date: String,
    pub day: DaySummary,
    pub astro: Astro,
    pub hour: Vec<HourForecast>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tides: Option<Vec<TideDay>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaySummary {
    pub maxtemp_c: f64,
    pub mintemp_c: f64,
    pub maxwind_kph: f64,
    pub daily_chance_of_rain: f64,
    pub condition: Condition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Astro {
    pub sunrise: String,
    pub sunset: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HourForecast {
    pub time: String,
    pub temp_c: f64,
    pub wind_kph: f64,
    pub wind_dir: String,
    pub chance_of_rain: f64,
    pub condition: Condition,
    /// Significant wave height (marine forecasts only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sig_ht_mt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swell_ht_mt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_temp_c: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TideDay {
    pub tide: Vec<Tide>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tide {
    pub tide_time: String,
    pub tide_height_mt: String,
    pub tide_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_conversion_defaults_missing_fields() {
        let record: LighthouseRecord = serde_json::from_str(
            r#"{"Id": 7, "Name": "Lista", "Description": null, "Latitude": null, "Longitude": 6.6, "Elevation": null}"#,
        )
        .expect("record should deserialize");

        let lh = Lighthouse::from(record);
        assert_eq!(lh.id, "7");
        assert_eq!(lh.description, "");
        assert_eq!(lh.lat, 0.0);
        assert_eq!(lh.lon, 6.6);
        assert_eq!(lh.elevation, None);
    }

    #[test]
    fn test_name_matches_is_case_insensitive() {
        let lh = Lighthouse {
            id: "1".into(),
            name: "Lindesnes Fyr".into(),
            description: String::new(),
            lat: 58.0,
            lon: 7.0,
            elevation: Some(50.0),
        };
        assert!(lh.name_matches("fyr"));
        assert!(lh.name_matches(""));
        assert!(!lh.name_matches("lista"));
    }

    #[test]
    fn test_partial_forecast_survives_reencode() {
        let parsed: ForecastResponse =
            serde_json::from_str(r#"{"current":{"temp_c":12}}"#).expect("partial payload");
        assert_eq!(parsed.current.as_ref().map(|c| c.temp_c), Some(12.0));
        assert!(parsed.location.is_none());

        let encoded = serde_json::to_string(&parsed).expect("encode");
        let decoded: ForecastResponse = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, parsed);
    }

    #[test]
    fn test_wind_ms_conversion() {
        let current = CurrentConditions {
            wind_kph: 36.0,
            ..Default::default()
        };
        assert!((current.wind_ms() - 10.0).abs() < 1e-9);
    }
}
