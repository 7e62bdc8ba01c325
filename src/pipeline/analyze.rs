use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{AnalysisError, ValidationError};
use crate::pipeline::calories::CalorieModel;
use crate::pipeline::{parse, process};
use crate::terrain::{OverpassClient, TerrainClassifier};
use crate::types::activity::{Route, TrackFormat};
use crate::types::analysis::RideAnalysis;
use crate::weather::WeatherCoordinator;

/// Runs a track through parsing, metrics, weather and terrain enrichment and
/// the calorie model.
pub struct RideAnalyzer {
    weather: WeatherCoordinator,
    terrain: TerrainClassifier,
    calories: CalorieModel,
}

impl RideAnalyzer {
    pub fn new(weather: WeatherCoordinator, terrain: TerrainClassifier, calories: CalorieModel) -> Self {
        Self {
            weather,
            terrain,
            calories,
        }
    }

    /// Wires the default weather providers and the Overpass client.
    pub fn from_config(config: &Config) -> Self {
        let overpass = OverpassClient::new(
            config.terrain.overpass_url.clone(),
            config.terrain.search_radius_m,
            config.terrain.batch.request_timeout,
        );
        Self::new(
            WeatherCoordinator::from_config(&config.weather),
            TerrainClassifier::new(
                Arc::new(overpass),
                config.terrain.sampling,
                config.terrain.batch,
                config.terrain.retry,
            ),
            CalorieModel::new(config.calories.clone()),
        )
    }

    pub async fn analyze(
        &self,
        bytes: &[u8],
        format: Option<TrackFormat>,
        rider_weight_kg: f64,
        cancel: &CancellationToken,
    ) -> Result<RideAnalysis, AnalysisError> {
        let route = parse::parse(bytes, format)?;
        self.analyze_route(&route, rider_weight_kg, cancel).await
    }

    /// Same as [`analyze`](Self::analyze) for an already parsed route.
    pub async fn analyze_route(
        &self,
        route: &Route,
        rider_weight_kg: f64,
        cancel: &CancellationToken,
    ) -> Result<RideAnalysis, AnalysisError> {
        if !rider_weight_kg.is_finite() || rider_weight_kg <= 0.0 {
            return Err(ValidationError::InvalidRiderWeight(rider_weight_kg).into());
        }

        let metrics = process::compute_metrics(route)?;
        tracing::info!(
            format = route.format.as_str(),
            points = metrics.point_count,
            distance_km = metrics.distance_m / 1000.0,
            duration_s = metrics.duration_seconds,
            "Computed ride metrics"
        );

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let (weather, terrain) = tokio::join!(
            self.weather
                .snapshot(&metrics.bounding_box, route.start_time(), cancel),
            self.terrain.classify(route, cancel),
        );

        if cancel.is_cancelled() {
            tracing::info!("Analysis cancelled after enrichment");
            return Err(AnalysisError::Cancelled);
        }

        let calories = self.calories.estimate(&metrics, rider_weight_kg, &weather);
        tracing::info!(
            total_kcal = calories.total_kcal,
            weather = weather.has_data,
            terrain = terrain.summary.dominant.as_str(),
            "Ride analysed"
        );

        Ok(RideAnalysis {
            format: route.format,
            rider_weight_kg,
            metrics,
            calories,
            weather,
            terrain_segments: terrain.segments,
            terrain_summary: terrain.summary,
            terrain_source: terrain.stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExternalServiceError;
    use crate::terrain::{BatchPolicy, FeatureTags, RetryPolicy, SamplingPolicy, TerrainSource};
    use async_trait::async_trait;
    use std::time::Duration;

    struct NoFeatures;

    #[async_trait]
    impl TerrainSource for NoFeatures {
        fn name(&self) -> &'static str {
            "none"
        }

        async fn features_near(
            &self,
            _lat: f64,
            _lon: f64,
        ) -> Result<Vec<FeatureTags>, ExternalServiceError> {
            Ok(Vec::new())
        }
    }

    fn analyzer() -> RideAnalyzer {
        RideAnalyzer::new(
            WeatherCoordinator::new(Vec::new(), Duration::from_secs(1)),
            TerrainClassifier::new(
                Arc::new(NoFeatures),
                SamplingPolicy::default(),
                BatchPolicy::unthrottled(),
                RetryPolicy::immediate(),
            ),
            CalorieModel::default(),
        )
    }

    const TWO_POINTS: &[u8] = br#"<gpx><trk><trkseg>
        <trkpt lat="46.0" lon="7.0"><ele>500</ele><time>2024-05-01T08:00:00Z</time></trkpt>
        <trkpt lat="46.01" lon="7.0"><ele>520</ele><time>2024-05-01T08:05:00Z</time></trkpt>
    </trkseg></trk></gpx>"#;

    #[tokio::test]
    async fn rejects_non_positive_rider_weight() {
        let err = analyzer()
            .analyze(TWO_POINTS, None, 0.0, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Validation(ValidationError::InvalidRiderWeight(_))
        ));
    }

    #[tokio::test]
    async fn cancelled_analysis_reports_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = analyzer()
            .analyze(TWO_POINTS, None, 70.0, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
    }

    #[tokio::test]
    async fn completes_without_any_enrichment() {
        let analysis = analyzer()
            .analyze(TWO_POINTS, Some(TrackFormat::Gpx), 70.0, &CancellationToken::new())
            .await
            .unwrap();

        assert!(!analysis.weather.has_data);
        assert_eq!(analysis.metrics.point_count, 2);
        assert_eq!(analysis.terrain_source.remote, 0);
        assert!(analysis.calories.total_kcal > 0);
    }
}
