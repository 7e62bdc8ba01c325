//! Weather backends behind one capability-described interface.
//!
//! Callers only see [`WeatherProvider`]: whether a backend has its
//! credential, how far back its history reaches, and the two lookups. Each
//! backend converts its own payload into a [`WeatherSnapshot`].

mod coordinator;
pub mod meteostat;
pub mod openweather;
pub mod visualcrossing;
pub mod weatherapi;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::config::WeatherConfig;
use crate::error::{ConfigurationError, ExternalServiceError, WeatherError};
use crate::types::weather::WeatherSnapshot;

pub use coordinator::{NoWeatherReason, WeatherCoordinator, WeatherOutcome};
pub use meteostat::MeteostatProvider;
pub use openweather::OpenWeatherProvider;
pub use visualcrossing::VisualCrossingProvider;
pub use weatherapi::WeatherApiProvider;

pub const MS_TO_KMH: f64 = 3.6;

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// How many days back historical lookups reach. 0 means none.
    fn max_historical_days(&self) -> u32;

    /// True when the credential the backend needs is present.
    fn is_configured(&self) -> bool;

    async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, WeatherError>;

    /// Conditions at `at`, or the closest observation the backend has that day.
    async fn historical_weather(
        &self,
        lat: f64,
        lon: f64,
        at: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError>;

    /// Whether `date` falls inside the historical window, counted in local
    /// calendar days back from today.
    fn supports_date(&self, date: NaiveDate) -> bool {
        date_within_window(self.max_historical_days(), date, Local::now().date_naive())
    }
}

pub fn date_within_window(max_days: u32, date: NaiveDate, today: NaiveDate) -> bool {
    if date > today {
        return false;
    }
    (today - date).num_days() <= i64::from(max_days)
}

/// Default backends in priority order, each configured from `config`.
pub fn default_providers(config: &WeatherConfig) -> Vec<Arc<dyn WeatherProvider>> {
    vec![
        Arc::new(OpenWeatherProvider::new(
            config.openweather_api_key.clone(),
            config.timeout,
        )),
        Arc::new(WeatherApiProvider::new(
            config.weatherapi_key.clone(),
            config.timeout,
        )),
        Arc::new(VisualCrossingProvider::new(
            config.visualcrossing_api_key.clone(),
            config.timeout,
        )),
        Arc::new(MeteostatProvider::new(
            config.meteostat_api_key.clone(),
            config.timeout,
        )),
    ]
}

pub(crate) fn require_key<'a>(
    key: &'a Option<String>,
    provider: &'static str,
    variable: &'static str,
) -> Result<&'a str, ConfigurationError> {
    key.as_deref()
        .ok_or(ConfigurationError::MissingCredential { provider, variable })
}

/// Sends a request and decodes a JSON body, mapping every failure onto
/// [`ExternalServiceError`].
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    service: &'static str,
    timeout: Duration,
) -> Result<T, ExternalServiceError> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| ExternalServiceError::from_reqwest(service, timeout, e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ExternalServiceError::from_status(service, status, body));
    }

    response
        .json()
        .await
        .map_err(|e| ExternalServiceError::InvalidPayload {
            service,
            message: e.to_string(),
        })
}

/// Picks the observation whose timestamp is nearest to `target`.
pub(crate) fn closest_to<T>(
    observations: impl IntoIterator<Item = T>,
    target: i64,
    epoch: impl Fn(&T) -> i64,
) -> Option<T> {
    observations
        .into_iter()
        .min_by_key(|obs| (epoch(obs) - target).abs())
}
