use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ExternalServiceError, WeatherError};
use crate::types::weather::WeatherSnapshot;
use crate::weather::{closest_to, fetch_json, require_key, WeatherProvider};

const NAME: &str = "weatherapi";
const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com";

/// WeatherAPI.com, with a year of history on paid plans.
pub struct WeatherApiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: WeatherApiObservation,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    forecast: Forecast,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Deserialize)]
struct ForecastDay {
    #[serde(default)]
    hour: Vec<WeatherApiObservation>,
}

/// Shared by `current` and the hourly history entries.
#[derive(Debug, Deserialize)]
struct WeatherApiObservation {
    #[serde(alias = "last_updated_epoch")]
    time_epoch: i64,
    temp_c: f64,
    humidity: Option<f64>,
    wind_kph: Option<f64>,
    wind_degree: Option<f64>,
    pressure_mb: Option<f64>,
    uv: Option<f64>,
    condition: Option<Condition>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: String,
}

impl WeatherApiProvider {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn key(&self) -> Result<&str, WeatherError> {
        Ok(require_key(&self.api_key, NAME, "WEATHERAPI_KEY")?)
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn max_historical_days(&self) -> u32 {
        365
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, WeatherError> {
        let key = self.key()?;
        let request = self
            .client
            .get(format!("{}/v1/current.json", self.base_url))
            .query(&[("key", key.to_string()), ("q", format!("{lat},{lon}"))]);

        let response: CurrentResponse = fetch_json(request, NAME, self.timeout).await?;
        Ok(normalize(response.current))
    }

    async fn historical_weather(
        &self,
        lat: f64,
        lon: f64,
        at: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let key = self.key()?;
        let request = self
            .client
            .get(format!("{}/v1/history.json", self.base_url))
            .query(&[
                ("key", key.to_string()),
                ("q", format!("{lat},{lon}")),
                ("dt", at.format("%Y-%m-%d").to_string()),
            ]);

        let response: HistoryResponse = fetch_json(request, NAME, self.timeout).await?;
        let hours = response
            .forecast
            .forecastday
            .into_iter()
            .flat_map(|day| day.hour);
        let observation = closest_to(hours, at.timestamp(), |o| o.time_epoch)
            .ok_or(ExternalServiceError::NoData { service: NAME })?;
        Ok(normalize(observation))
    }
}

fn normalize(obs: WeatherApiObservation) -> WeatherSnapshot {
    WeatherSnapshot {
        temperature_c: Some(obs.temp_c),
        humidity_percent: obs.humidity,
        wind_speed_kmh: obs.wind_kph,
        wind_direction_deg: obs.wind_degree,
        pressure_hpa: obs.pressure_mb,
        uv_index: obs.uv,
        condition_text: obs.condition.map(|c| c.text),
        observed_at: DateTime::from_timestamp(obs.time_epoch, 0),
        ..WeatherSnapshot::from_provider(NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_picks_hour_nearest_ride_start() {
        let response: HistoryResponse = serde_json::from_str(
            r#"{
                "location": {"name": "Bern"},
                "forecast": {"forecastday": [{
                    "date": "2026-06-01",
                    "day": {"maxtemp_c": 24.0},
                    "hour": [
                        {"time_epoch": 1780300800, "temp_c": 14.0, "humidity": 70, "wind_kph": 5.0, "wind_degree": 90, "pressure_mb": 1015, "uv": 0, "condition": {"text": "Clear"}},
                        {"time_epoch": 1780336800, "temp_c": 23.5, "humidity": 40, "wind_kph": 12.0, "wind_degree": 200, "pressure_mb": 1013, "uv": 6, "condition": {"text": "Sunny"}}
                    ]
                }]}
            }"#,
        )
        .unwrap();

        let hours = response.forecast.forecastday.into_iter().flat_map(|d| d.hour);
        let snapshot = normalize(closest_to(hours, 1780335000, |o| o.time_epoch).unwrap());

        assert_eq!(snapshot.temperature_c, Some(23.5));
        assert_eq!(snapshot.wind_speed_kmh, Some(12.0));
        assert_eq!(snapshot.uv_index, Some(6.0));
        assert_eq!(snapshot.condition_text.as_deref(), Some("Sunny"));
    }

    #[test]
    fn current_payload_uses_last_updated_epoch() {
        let response: CurrentResponse = serde_json::from_str(
            r#"{"current": {"last_updated_epoch": 1780336800, "temp_c": 18.0, "wind_kph": 9.0, "wind_degree": 45, "condition": {"text": "Cloudy"}}}"#,
        )
        .unwrap();
        let snapshot = normalize(response.current);
        assert_eq!(snapshot.observed_at.map(|t| t.timestamp()), Some(1780336800));
        assert_eq!(snapshot.humidity_percent, None);
    }
}
