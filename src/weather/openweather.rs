use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ExternalServiceError, WeatherError};
use crate::types::weather::WeatherSnapshot;
use crate::weather::{closest_to, fetch_json, require_key, WeatherProvider, MS_TO_KMH};

const NAME: &str = "openweathermap";
const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// `OpenWeatherMap` One Call 3.0. The time machine endpoint serves the last
/// five days.
pub struct OpenWeatherProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

/// Current response of the One Call API
#[derive(Debug, Deserialize)]
struct OneCallResponse {
    current: OpenWeatherObservation,
}

/// Time machine response of the One Call API
#[derive(Debug, Deserialize)]
struct TimeMachineResponse {
    data: Vec<OpenWeatherObservation>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherObservation {
    dt: i64,
    temp: f64,
    pressure: Option<f64>,
    humidity: Option<f64>,
    uvi: Option<f64>,
    /// meters per second
    wind_speed: Option<f64>,
    wind_deg: Option<f64>,
    #[serde(default)]
    weather: Vec<OpenWeatherCondition>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherCondition {
    main: String,
    description: String,
}

impl OpenWeatherProvider {
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
        Ok(require_key(&self.api_key, NAME, "OPENWEATHER_API_KEY")?)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn max_historical_days(&self) -> u32 {
        5
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, WeatherError> {
        let key = self.key()?;
        let request = self
            .client
            .get(format!("{}/data/3.0/onecall", self.base_url))
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("exclude", "minutely,hourly,daily,alerts".to_string()),
                ("units", "metric".to_string()),
                ("appid", key.to_string()),
            ]);

        let response: OneCallResponse = fetch_json(request, NAME, self.timeout).await?;
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
            .get(format!("{}/data/3.0/onecall/timemachine", self.base_url))
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("dt", at.timestamp().to_string()),
                ("units", "metric".to_string()),
                ("appid", key.to_string()),
            ]);

        let response: TimeMachineResponse = fetch_json(request, NAME, self.timeout).await?;
        let observation = closest_to(response.data, at.timestamp(), |o| o.dt)
            .ok_or(ExternalServiceError::NoData { service: NAME })?;
        Ok(normalize(observation))
    }
}

fn normalize(obs: OpenWeatherObservation) -> WeatherSnapshot {
    let condition_text = obs.weather.first().map(|w| {
        if w.description.eq_ignore_ascii_case(&w.main) {
            w.main.clone()
        } else {
            format!("{} - {}", w.main, w.description)
        }
    });

    WeatherSnapshot {
        temperature_c: Some(obs.temp),
        humidity_percent: obs.humidity,
        wind_speed_kmh: obs.wind_speed.map(|ws| ws * MS_TO_KMH),
        wind_direction_deg: obs.wind_deg,
        pressure_hpa: obs.pressure,
        uv_index: obs.uvi,
        condition_text,
        observed_at: DateTime::from_timestamp(obs.dt, 0),
        ..WeatherSnapshot::from_provider(NAME)
    }
}
