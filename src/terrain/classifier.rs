use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::error::ExternalServiceError;
use crate::pipeline::process::step_distances;
use crate::terrain::classify::{classify_tags, elevation_fallback};
use crate::terrain::merge::{merge_segments, sample_indices, summarize};
use crate::terrain::{BatchPolicy, FeatureTags, RetryPolicy, SamplingPolicy, TerrainSource};
use crate::types::activity::{Route, TrackPoint};
use crate::types::terrain::{
    ClassificationSource, PointClassification, TerrainSegment, TerrainSourceStats, TerrainSummary,
};

#[derive(Debug, Clone)]
pub struct TerrainReport {
    pub segments: Vec<TerrainSegment>,
    pub summary: TerrainSummary,
    pub stats: TerrainSourceStats,
}

pub struct TerrainClassifier {
    source: Arc<dyn TerrainSource>,
    sampling: SamplingPolicy,
    batch: BatchPolicy,
    retry: RetryPolicy,
}

impl TerrainClassifier {
    pub fn new(
        source: Arc<dyn TerrainSource>,
        sampling: SamplingPolicy,
        batch: BatchPolicy,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            sampling,
            batch,
            retry,
        }
    }

    /// Classifies the whole route. Never fails: lookups that cannot be
    /// completed (errors, timeouts, cancellation) use the elevation fallback.
    pub async fn classify(&self, route: &Route, cancel: &CancellationToken) -> TerrainReport {
        let points = &route.points;
        let samples = sample_indices(points.len(), self.sampling.stride, self.sampling.max_samples);
        let mut results: Vec<Option<PointClassification>> = vec![None; samples.len()];

        tracing::info!(
            points = points.len(),
            samples = samples.len(),
            source = self.source.name(),
            "Classifying terrain"
        );

        let batch_size = self.batch.batch_size.max(1);
        for (batch_no, chunk) in samples.chunks(batch_size).enumerate() {
            if batch_no > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.batch.inter_batch_delay) => {}
                }
            }
            if cancel.is_cancelled() {
                tracing::info!(batch = batch_no, "Terrain classification cancelled");
                break;
            }

            let offset = batch_no * batch_size;
            let lookups = chunk.iter().enumerate().map(|(k, &point_index)| async move {
                let point = &points[point_index];
                (offset + k, self.classify_point(point, cancel).await)
            });

            for (slot, classification) in join_all(lookups).await {
                results[slot] = Some(classification);
            }
        }

        let classifications: Vec<PointClassification> = results
            .into_iter()
            .zip(&samples)
            .map(|(result, &index)| result.unwrap_or_else(|| elevation_fallback(points[index].elevation)))
            .collect();

        let stats = classifications.iter().fold(
            TerrainSourceStats {
                sampled: classifications.len(),
                ..TerrainSourceStats::default()
            },
            |mut stats, c| {
                match c.source {
                    ClassificationSource::Remote => stats.remote += 1,
                    ClassificationSource::ElevationFallback | ClassificationSource::Unclassified => {
                        stats.fallback += 1
                    }
                }
                stats
            },
        );

        let steps = step_distances(points);
        let segments = merge_segments(points, &steps, &samples, &classifications);
        let summary = summarize(&segments);

        tracing::info!(
            segments = segments.len(),
            remote = stats.remote,
            fallback = stats.fallback,
            dominant = summary.dominant.as_str(),
            "Terrain classified"
        );

        TerrainReport {
            segments,
            summary,
            stats,
        }
    }

    async fn classify_point(
        &self,
        point: &TrackPoint,
        cancel: &CancellationToken,
    ) -> PointClassification {
        match self.lookup_with_retry(point, cancel).await {
            Ok(features) => {
                classify_tags(&features).unwrap_or_else(|| elevation_fallback(point.elevation))
            }
            Err(e) => {
                tracing::warn!(
                    lat = point.lat,
                    lon = point.lon,
                    error = %e,
                    "Terrain lookup failed, using elevation fallback"
                );
                elevation_fallback(point.elevation)
            }
        }
    }

    async fn lookup_with_retry(
        &self,
        point: &TrackPoint,
        cancel: &CancellationToken,
    ) -> Result<Vec<FeatureTags>, ExternalServiceError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let lookup = tokio::time::timeout(
                self.batch.request_timeout,
                self.source.features_near(point.lat, point.lon),
            );

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(ExternalServiceError::Cancelled),
                result = lookup => result.unwrap_or_else(|_| {
                    Err(ExternalServiceError::Timeout {
                        service: self.source.name(),
                        timeout: self.batch.request_timeout,
                    })
                }),
            };

            let err = match result {
                Ok(features) => return Ok(features),
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(e) => e,
            };

            let delay = self.retry.delay_after(attempt);
            tracing::debug!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying terrain lookup"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(ExternalServiceError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
