//! Wind alert evaluation.

use common::{ForecastResponse, Lighthouse};
use serde::Serialize;

/// Raised when current wind at a watched lighthouse reaches its threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindAlert {
    pub id: String,
    pub name: String,
    pub wind_speed_ms: f64,
    pub threshold_ms: f64,
}

/// Compare the forecast's current wind against `threshold_ms`.
///
/// Forecasts without current conditions never alert.
pub fn evaluate(
    lighthouse: &Lighthouse,
    forecast: &ForecastResponse,
    threshold_ms: f64,
) -> Option<WindAlert> {
    let wind_speed_ms = forecast.current.as_ref()?.wind_ms();
    if wind_speed_ms >= threshold_ms {
        Some(WindAlert {
            id: lighthouse.id.clone(),
            name: lighthouse.name.clone(),
            wind_speed_ms,
            threshold_ms,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::CurrentConditions;

    fn lista() -> Lighthouse {
        Lighthouse {
            id: "1".into(),
            name: "Lista".into(),
            description: String::new(),
            lat: 58.1,
            lon: 6.6,
            elevation: None,
        }
    }

    fn with_wind(kph: f64) -> ForecastResponse {
        ForecastResponse {
            current: Some(CurrentConditions {
                wind_kph: kph,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_alert_at_and_above_threshold() {
        let alert = evaluate(&lista(), &with_wind(54.0), 15.0).expect("15 m/s reaches 15");
        assert_eq!(alert.id, "1");
        assert!((alert.wind_speed_ms - 15.0).abs() < 1e-9);

        assert!(evaluate(&lista(), &with_wind(72.0), 15.0).is_some());
    }

    #[test]
    fn test_no_alert_below_threshold_or_without_current() {
        assert!(evaluate(&lista(), &with_wind(36.0), 15.0).is_none());
        assert!(evaluate(&lista(), &ForecastResponse::default(), 0.0).is_none());
    }
}
