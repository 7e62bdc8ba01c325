use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tokio_util::sync::CancellationToken;

use crate::config::WeatherConfig;
use crate::types::activity::BoundingBox;
use crate::types::weather::WeatherSnapshot;
use crate::weather::{default_providers, WeatherProvider};

#[derive(Debug, Clone, PartialEq)]
pub enum WeatherOutcome {
    Enriched(WeatherSnapshot),
    NoWeather(NoWeatherReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NoWeatherReason {
    NotConfigured,
    DateOutOfRange,
    Failed(String),
    Cancelled,
}

impl fmt::Display for NoWeatherReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoWeatherReason::NotConfigured => write!(f, "no weather provider configured"),
            NoWeatherReason::DateOutOfRange => {
                write!(f, "ride date outside every provider's history")
            }
            NoWeatherReason::Failed(message) => write!(f, "provider call failed: {message}"),
            NoWeatherReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl WeatherOutcome {
    pub fn into_snapshot(self) -> WeatherSnapshot {
        match self {
            WeatherOutcome::Enriched(snapshot) => snapshot,
            WeatherOutcome::NoWeather(_) => WeatherSnapshot::no_data(),
        }
    }
}

/// Chooses between current and historical conditions for a ride and calls
/// exactly one provider. Every failure degrades to [`WeatherOutcome::NoWeather`].
pub struct WeatherCoordinator {
    providers: Vec<Arc<dyn WeatherProvider>>,
    timeout: Duration,
}

impl WeatherCoordinator {
    /// `providers` are tried in order; `timeout` bounds the single call.
    pub fn new(providers: Vec<Arc<dyn WeatherProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    pub fn from_config(config: &WeatherConfig) -> Self {
        Self::new(default_providers(config), config.timeout)
    }

    pub async fn enrich(
        &self,
        bbox: &BoundingBox,
        start_time: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> WeatherOutcome {
        if cancel.is_cancelled() {
            return WeatherOutcome::NoWeather(NoWeatherReason::Cancelled);
        }

        let mut configured = self.providers.iter().filter(|p| p.is_configured()).peekable();
        let Some(&first) = configured.peek() else {
            tracing::info!("No weather provider configured, skipping weather");
            return WeatherOutcome::NoWeather(NoWeatherReason::NotConfigured);
        };

        let (lat, lon) = bbox.center();
        let today = Local::now().date_naive();
        let historical = start_time.filter(|t| t.with_timezone(&Local).date_naive() < today);

        let (provider, historical_at) = match historical {
            None => (first, None),
            Some(at) => {
                let date = at.with_timezone(&Local).date_naive();
                match configured.find(|p| p.supports_date(date)) {
                    Some(provider) => (provider, Some(at)),
                    None => {
                        tracing::info!(%date, "Ride date outside provider history, skipping weather");
                        return WeatherOutcome::NoWeather(NoWeatherReason::DateOutOfRange);
                    }
                }
            }
        };

        tracing::debug!(
            provider = provider.name(),
            historical = historical_at.is_some(),
            lat,
            lon,
            "Requesting weather"
        );

        let request = async {
            match historical_at {
                Some(at) => provider.historical_weather(lat, lon, at).await,
                None => provider.current_weather(lat, lon).await,
            }
        };

        let outcome = tokio::select! {
            _ = cancel.cancelled() => WeatherOutcome::NoWeather(NoWeatherReason::Cancelled),
            result = tokio::time::timeout(self.timeout, request) => match result {
                Ok(Ok(snapshot)) => WeatherOutcome::Enriched(snapshot),
                Ok(Err(e)) => WeatherOutcome::NoWeather(NoWeatherReason::Failed(e.to_string())),
                Err(_) => WeatherOutcome::NoWeather(NoWeatherReason::Failed(format!(
                    "{} did not answer within {:?}",
                    provider.name(),
                    self.timeout
                ))),
            },
        };

        match &outcome {
            WeatherOutcome::Enriched(snapshot) => tracing::info!(
                provider = provider.name(),
                temperature_c = ?snapshot.temperature_c,
                wind_speed_kmh = ?snapshot.wind_speed_kmh,
                "Weather enriched"
            ),
            WeatherOutcome::NoWeather(reason) => tracing::warn!(
                provider = provider.name(),
                %reason,
                "Continuing without weather"
            ),
        }
        outcome
    }

    /// [`enrich`](Self::enrich) collapsed into a snapshot.
    pub async fn snapshot(
        &self,
        bbox: &BoundingBox,
        start_time: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> WeatherSnapshot {
        self.enrich(bbox, start_time, cancel).await.into_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExternalServiceError, WeatherError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        name: &'static str,
        configured: bool,
        window_days: u32,
        fail: bool,
        current_calls: AtomicUsize,
        historical_calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(name: &'static str, window_days: u32) -> Self {
            Self {
                name,
                configured: true,
                window_days,
                fail: false,
                current_calls: AtomicUsize::new(0),
                historical_calls: AtomicUsize::new(0),
            }
        }

        fn answer(&self) -> Result<WeatherSnapshot, WeatherError> {
            if self.fail {
                return Err(ExternalServiceError::NoData { service: "stub" }.into());
            }
            Ok(WeatherSnapshot {
                temperature_c: Some(18.0),
                ..WeatherSnapshot::from_provider(self.name)
            })
        }
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn max_historical_days(&self) -> u32 {
            self.window_days
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn current_weather(&self, _lat: f64, _lon: f64) -> Result<WeatherSnapshot, WeatherError> {
            self.current_calls.fetch_add(1, Ordering::SeqCst);
            self.answer()
        }

        async fn historical_weather(
            &self,
            _lat: f64,
            _lon: f64,
            _at: DateTime<Utc>,
        ) -> Result<WeatherSnapshot, WeatherError> {
            self.historical_calls.fetch_add(1, Ordering::SeqCst);
            self.answer()
        }
    }

    fn bbox() -> BoundingBox {
        BoundingBox {
            min_lat: 46.9,
            max_lat: 47.0,
            min_lon: 7.4,
            max_lon: 7.5,
        }
    }

    fn coordinator(providers: Vec<Arc<StubProvider>>) -> WeatherCoordinator {
        WeatherCoordinator::new(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn WeatherProvider>)
                .collect(),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn ride_today_uses_current_weather() {
        let stub = Arc::new(StubProvider::new("stub", 5));
        let outcome = coordinator(vec![stub.clone()])
            .enrich(&bbox(), Some(Utc::now()), &CancellationToken::new())
            .await;

        assert!(matches!(outcome, WeatherOutcome::Enriched(_)));
        assert_eq!(stub.current_calls.load(Ordering::SeqCst), 1);
        assert_eq!(stub.historical_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ride_without_timestamps_counts_as_today() {
        let stub = Arc::new(StubProvider::new("stub", 0));
        let snapshot = coordinator(vec![stub.clone()])
            .snapshot(&bbox(), None, &CancellationToken::new())
            .await;

        assert!(snapshot.has_data);
        assert_eq!(stub.current_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn date_beyond_window_makes_no_call() {
        let stub = Arc::new(StubProvider::new("stub", 5));
        let ten_days_ago = Utc::now() - chrono::Duration::days(10);
        let outcome = coordinator(vec![stub.clone()])
            .enrich(&bbox(), Some(ten_days_ago), &CancellationToken::new())
            .await;

        assert_eq!(outcome, WeatherOutcome::NoWeather(NoWeatherReason::DateOutOfRange));
        assert!(!outcome.into_snapshot().has_data);
        assert_eq!(stub.current_calls.load(Ordering::SeqCst), 0);
        assert_eq!(stub.historical_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn historical_lookup_goes_to_first_provider_covering_the_date() {
        let short = Arc::new(StubProvider::new("short", 5));
        let long = Arc::new(StubProvider::new("long", 365));
        let ten_days_ago = Utc::now() - chrono::Duration::days(10);
        let snapshot = coordinator(vec![short.clone(), long.clone()])
            .snapshot(&bbox(), Some(ten_days_ago), &CancellationToken::new())
            .await;

        assert_eq!(snapshot.source_provider.as_deref(), Some("long"));
        assert_eq!(short.historical_calls.load(Ordering::SeqCst), 0);
        assert_eq!(long.historical_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unconfigured_providers_are_skipped() {
        let stub = Arc::new(StubProvider {
            configured: false,
            ..StubProvider::new("stub", 5)
        });
        let outcome = coordinator(vec![stub.clone()])
            .enrich(&bbox(), None, &CancellationToken::new())
            .await;

        assert_eq!(outcome, WeatherOutcome::NoWeather(NoWeatherReason::NotConfigured));
        assert_eq!(stub.current_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_failure_degrades_without_failover() {
        let failing = Arc::new(StubProvider {
            fail: true,
            ..StubProvider::new("failing", 5)
        });
        let backup = Arc::new(StubProvider::new("backup", 5));
        let outcome = coordinator(vec![failing.clone(), backup.clone()])
            .enrich(&bbox(), None, &CancellationToken::new())
            .await;

        assert!(matches!(outcome, WeatherOutcome::NoWeather(NoWeatherReason::Failed(_))));
        assert_eq!(failing.current_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backup.current_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_call() {
        let stub = Arc::new(StubProvider::new("stub", 5));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = coordinator(vec![stub.clone()])
            .enrich(&bbox(), None, &cancel)
            .await;

        assert_eq!(outcome, WeatherOutcome::NoWeather(NoWeatherReason::Cancelled));
        assert_eq!(stub.current_calls.load(Ordering::SeqCst), 0);
    }
}
