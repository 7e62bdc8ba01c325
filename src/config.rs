use std::str::FromStr;
use std::time::Duration;

use crate::pipeline::calories::CalorieConfig;
use crate::terrain::{BatchPolicy, RetryPolicy, SamplingPolicy};

#[derive(Debug, Clone)]
pub struct Config {
    pub weather: WeatherConfig,
    pub terrain: TerrainConfig,
    pub calories: CalorieConfig,
    pub default_rider_weight_kg: f64,
}

#[derive(Debug, Clone, Default)]
pub struct WeatherConfig {
    pub openweather_api_key: Option<String>,
    pub weatherapi_key: Option<String>,
    pub visualcrossing_api_key: Option<String>,
    pub meteostat_api_key: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TerrainConfig {
    pub overpass_url: String,
    pub search_radius_m: u32,
    pub sampling: SamplingPolicy,
    pub batch: BatchPolicy,
    pub retry: RetryPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        let weather = WeatherConfig {
            openweather_api_key: env_secret("OPENWEATHER_API_KEY"),
            weatherapi_key: env_secret("WEATHERAPI_KEY"),
            visualcrossing_api_key: env_secret("VISUALCROSSING_API_KEY"),
            meteostat_api_key: env_secret("METEOSTAT_API_KEY"),
            timeout: Duration::from_secs(env_or("WEATHER_TIMEOUT_SECONDS", 10)),
        };

        let terrain = TerrainConfig {
            overpass_url: std::env::var("OVERPASS_URL")
                .unwrap_or_else(|_| "https://overpass-api.de/api/interpreter".to_string()),
            search_radius_m: env_or("TERRAIN_SEARCH_RADIUS_M", 100),
            sampling: SamplingPolicy {
                stride: env_or("TERRAIN_SAMPLE_STRIDE", 10),
                max_samples: env_or("TERRAIN_MAX_SAMPLES", 50),
            },
            batch: BatchPolicy {
                batch_size: env_or("TERRAIN_BATCH_SIZE", 3),
                inter_batch_delay: Duration::from_millis(env_or("TERRAIN_BATCH_DELAY_MS", 2000)),
                request_timeout: Duration::from_secs(env_or(
                    "TERRAIN_REQUEST_TIMEOUT_SECONDS",
                    15,
                )),
            },
            retry: RetryPolicy {
                max_attempts: env_or("TERRAIN_MAX_ATTEMPTS", 3),
                base_delay: Duration::from_millis(env_or("TERRAIN_RETRY_BASE_DELAY_MS", 2000)),
                multiplier: 2.0,
            },
        };

        let calories = CalorieConfig {
            wind_resistance_coefficient: env_or("WIND_RESISTANCE_COEFFICIENT", 0.1),
            ..CalorieConfig::default()
        };

        Self {
            weather,
            terrain,
            calories,
            default_rider_weight_kg: env_or("DEFAULT_RIDER_WEIGHT_KG", 75.0),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_secret(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
