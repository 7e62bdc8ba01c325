//! Terrain classification of a route.
//!
//! A route is sampled, each sample is looked up against a geodata source in
//! throttled batches, the returned tags are mapped onto a [`TerrainType`] and
//! runs of equal types are merged into segments covering every point.
//!
//! [`TerrainType`]: crate::types::terrain::TerrainType

mod classifier;
pub mod classify;
pub mod merge;
pub mod overpass;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExternalServiceError;

pub use classifier::{TerrainClassifier, TerrainReport};
pub use overpass::OverpassClient;

/// Tags of one map feature, e.g. `landuse=forest`.
pub type FeatureTags = HashMap<String, String>;

/// A geodata service that can describe the surroundings of a point.
#[async_trait]
pub trait TerrainSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the tag sets of features near the point.
    async fn features_near(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<FeatureTags>, ExternalServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPolicy {
    /// Keep every Nth point. The first and last point are always kept.
    pub stride: usize,
    /// Upper bound on samples; the stride widens to respect it.
    pub max_samples: usize,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            stride: 10,
            max_samples: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchPolicy {
    /// Requests in flight at once.
    pub batch_size: usize,
    /// Pause between the end of one batch and the start of the next.
    pub inter_batch_delay: Duration,
    pub request_timeout: Duration,
}

impl BatchPolicy {
    pub fn unthrottled() -> Self {
        Self {
            inter_batch_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            batch_size: 3,
            inter_batch_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Longest single backoff wait.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Exponential backoff for a single lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Same attempt budget, no waiting between attempts.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Delay to wait after `failed_attempts` consecutive failures, capped at
    /// [`MAX_RETRY_DELAY`].
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(failed_attempts.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_RETRY_DELAY)
            .min(MAX_RETRY_DELAY)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}
