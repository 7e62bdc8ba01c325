use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ExternalServiceError, WeatherError};
use crate::types::weather::WeatherSnapshot;
use crate::weather::{closest_to, fetch_json, require_key, WeatherProvider};

const NAME: &str = "visualcrossing";
const DEFAULT_BASE_URL: &str = "https://weather.visualcrossing.com";
const TIMELINE_PATH: &str = "VisualCrossingWebServices/rest/services/timeline";

/// Visual Crossing Timeline API in metric units.
pub struct VisualCrossingProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineResponse {
    current_conditions: Option<TimelineObservation>,
    #[serde(default)]
    days: Vec<TimelineDay>,
}

#[derive(Debug, Deserialize)]
struct TimelineDay {
    #[serde(default)]
    hours: Vec<TimelineObservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineObservation {
    datetime_epoch: i64,
    temp: Option<f64>,
    humidity: Option<f64>,
    /// km/h with `unitGroup=metric`
    windspeed: Option<f64>,
    winddir: Option<f64>,
    pressure: Option<f64>,
    uvindex: Option<f64>,
    conditions: Option<String>,
}

impl VisualCrossingProvider {
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

    async fn timeline(
        &self,
        location_path: String,
        include: &str,
    ) -> Result<TimelineResponse, WeatherError> {
        let key = require_key(&self.api_key, NAME, "VISUALCROSSING_API_KEY")?;
        let request = self
            .client
            .get(format!("{}/{TIMELINE_PATH}/{location_path}", self.base_url))
            .query(&[
                ("key", key),
                ("unitGroup", "metric"),
                ("include", include),
                ("contentType", "json"),
            ]);
        Ok(fetch_json(request, NAME, self.timeout).await?)
    }
}

#[async_trait]
impl WeatherProvider for VisualCrossingProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn max_historical_days(&self) -> u32 {
        730
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, WeatherError> {
        let response = self.timeline(format!("{lat},{lon}"), "current").await?;
        let observation = response
            .current_conditions
            .ok_or(ExternalServiceError::NoData { service: NAME })?;
        Ok(normalize(observation))
    }

    async fn historical_weather(
        &self,
        lat: f64,
        lon: f64,
        at: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let date = at.format("%Y-%m-%d");
        let response = self.timeline(format!("{lat},{lon}/{date}"), "hours").await?;
        let hours = response.days.into_iter().flat_map(|day| day.hours);
        let observation = closest_to(hours, at.timestamp(), |o| o.datetime_epoch)
            .ok_or(ExternalServiceError::NoData { service: NAME })?;
        Ok(normalize(observation))
    }
}

fn normalize(obs: TimelineObservation) -> WeatherSnapshot {
    WeatherSnapshot {
        temperature_c: obs.temp,
        humidity_percent: obs.humidity,
        wind_speed_kmh: obs.windspeed,
        wind_direction_deg: obs.winddir,
        pressure_hpa: obs.pressure,
        uv_index: obs.uvindex,
        condition_text: obs.conditions,
        observed_at: DateTime::from_timestamp(obs.datetime_epoch, 0),
        ..WeatherSnapshot::from_provider(NAME)
    }
}
