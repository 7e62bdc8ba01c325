use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ExternalServiceError, WeatherError};
use crate::types::weather::WeatherSnapshot;
use crate::weather::{closest_to, fetch_json, require_key, WeatherProvider};

const NAME: &str = "meteostat";
const DEFAULT_BASE_URL: &str = "https://meteostat.p.rapidapi.com";
const RAPIDAPI_HOST: &str = "meteostat.p.rapidapi.com";

/// Meteostat point data through RapidAPI. Station records reach back about a
/// century; there is no live endpoint, so "current" is the latest hour
/// reported today.
pub struct MeteostatProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    #[serde(default)]
    data: Vec<HourlyRecord>,
}

/// One hourly record. Times are UTC; wind is in km/h.
#[derive(Debug, Deserialize)]
struct HourlyRecord {
    time: String,
    temp: Option<f64>,
    rhum: Option<f64>,
    wdir: Option<f64>,
    wspd: Option<f64>,
    pres: Option<f64>,
    coco: Option<f64>,
}

impl HourlyRecord {
    fn epoch(&self) -> Option<i64> {
        NaiveDateTime::parse_from_str(&self.time, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|t| t.and_utc().timestamp())
    }
}

impl MeteostatProvider {
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

    async fn hourly_near(
        &self,
        lat: f64,
        lon: f64,
        at: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let key = require_key(&self.api_key, NAME, "METEOSTAT_API_KEY")?;
        let day = at.format("%Y-%m-%d").to_string();
        let request = self
            .client
            .get(format!("{}/point/hourly", self.base_url))
            .header("x-rapidapi-key", key)
            .header("x-rapidapi-host", RAPIDAPI_HOST)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("start", day.clone()),
                ("end", day),
            ]);

        let response: HourlyResponse = fetch_json(request, NAME, self.timeout).await?;
        let records = response
            .data
            .into_iter()
            .filter(|r| r.temp.is_some())
            .filter_map(|r| r.epoch().map(|epoch| (epoch, r)));
        let (epoch, record) = closest_to(records, at.timestamp(), |(epoch, _)| *epoch)
            .ok_or(ExternalServiceError::NoData { service: NAME })?;
        Ok(normalize(epoch, record))
    }
}

#[async_trait]
impl WeatherProvider for MeteostatProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn max_historical_days(&self) -> u32 {
        36500
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, WeatherError> {
        self.hourly_near(lat, lon, Utc::now()).await
    }

    async fn historical_weather(
        &self,
        lat: f64,
        lon: f64,
        at: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        self.hourly_near(lat, lon, at).await
    }
}

fn normalize(epoch: i64, record: HourlyRecord) -> WeatherSnapshot {
    WeatherSnapshot {
        temperature_c: record.temp,
        humidity_percent: record.rhum,
        wind_speed_kmh: record.wspd,
        wind_direction_deg: record.wdir,
        pressure_hpa: record.pres,
        condition_text: record
            .coco
            .and_then(|code| condition_text(code as u8))
            .map(str::to_string),
        observed_at: DateTime::from_timestamp(epoch, 0),
        ..WeatherSnapshot::from_provider(NAME)
    }
}

/// Meteostat weather condition codes.
fn condition_text(code: u8) -> Option<&'static str> {
    let text = match code {
        1 => "Clear",
        2 => "Fair",
        3 => "Cloudy",
        4 => "Overcast",
        5 => "Fog",
        6 => "Freezing Fog",
        7 => "Light Rain",
        8 => "Rain",
        9 => "Heavy Rain",
        10 => "Freezing Rain",
        11 => "Heavy Freezing Rain",
        12 => "Sleet",
        13 => "Heavy Sleet",
        14 => "Light Snowfall",
        15 => "Snowfall",
        16 => "Heavy Snowfall",
        17 => "Rain Shower",
        18 => "Heavy Rain Shower",
        19 => "Sleet Shower",
        20 => "Heavy Sleet Shower",
        21 => "Snow Shower",
        22 => "Heavy Snow Shower",
        23 => "Lightning",
        24 => "Hail",
        25 => "Thunderstorm",
        26 => "Heavy Thunderstorm",
        27 => "Storm",
        _ => return None,
    };
    Some(text)
}
