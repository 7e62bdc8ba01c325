use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical weather conditions shared by every provider backend.
///
/// When `has_data` is false every numeric field is `None`; this is a normal
/// outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_c: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    /// Direction the wind blows from, in degrees.
    pub wind_direction_deg: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub uv_index: Option<f64>,
    pub condition_text: Option<String>,
    pub observed_at: Option<DateTime<Utc>>,
    pub source_provider: Option<String>,
    pub has_data: bool,
}

impl WeatherSnapshot {
    pub fn no_data() -> Self {
        Self {
            temperature_c: None,
            humidity_percent: None,
            wind_speed_kmh: None,
            wind_direction_deg: None,
            pressure_hpa: None,
            uv_index: None,
            condition_text: None,
            observed_at: None,
            source_provider: None,
            has_data: false,
        }
    }

    pub fn from_provider(provider: &str) -> Self {
        Self {
            source_provider: Some(provider.to_string()),
            has_data: true,
            ..Self::no_data()
        }
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature_c.filter(|_| self.has_data)
    }

    pub fn humidity(&self) -> Option<f64> {
        self.humidity_percent.filter(|_| self.has_data)
    }

    /// Wind speed and direction, only when both are known.
    pub fn wind(&self) -> Option<(f64, f64)> {
        if !self.has_data {
            return None;
        }
        Some((self.wind_speed_kmh?, self.wind_direction_deg?))
    }
}

impl Default for WeatherSnapshot {
    fn default() -> Self {
        Self::no_data()
    }
}
