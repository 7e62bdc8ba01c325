use std::collections::BTreeMap;

use crate::types::activity::TrackPoint;
use crate::types::terrain::{PointClassification, TerrainSegment, TerrainSummary, TerrainType};

/// Picks the indices to look up: every `stride`th point, widened so that at
/// most `max_samples` are returned, always including the first and last.
pub fn sample_indices(len: usize, stride: usize, max_samples: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }

    let max_samples = max_samples.max(2);
    let stride = stride.max(1).max((len - 1).div_ceil(max_samples - 1));

    let mut indices: Vec<usize> = (0..len).step_by(stride).collect();
    if indices.last() != Some(&(len - 1)) {
        indices.push(len - 1);
    }
    indices
}

struct SegmentBuilder {
    start: usize,
    end: usize,
    terrain: TerrainType,
    distance: f64,
    weighted_confidence: f64,
    confidence_sum: f64,
    members: usize,
}

impl SegmentBuilder {
    fn new(start: usize, terrain: TerrainType) -> Self {
        Self {
            start,
            end: start,
            terrain,
            distance: 0.0,
            weighted_confidence: 0.0,
            confidence_sum: 0.0,
            members: 0,
        }
    }

    fn absorb(&mut self, end: usize, distance: f64, confidence: f64) {
        self.end = end;
        self.distance += distance;
        self.weighted_confidence += distance * confidence;
        self.confidence_sum += confidence;
        self.members += 1;
    }

    fn finish(self, points: &[TrackPoint]) -> TerrainSegment {
        let confidence = if self.distance > 0.0 {
            self.weighted_confidence / self.distance
        } else {
            self.confidence_sum / self.members.max(1) as f64
        };

        let elevations: Vec<f64> = points[self.start..=self.end]
            .iter()
            .filter_map(|p| p.elevation)
            .collect();
        let average_elevation_m = if elevations.is_empty() {
            None
        } else {
            Some(elevations.iter().sum::<f64>() / elevations.len() as f64)
        };

        TerrainSegment {
            start_index: self.start,
            end_index: self.end,
            distance_m: self.distance,
            terrain: self.terrain,
            average_elevation_m,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Merges per-sample classifications into segments covering every point.
///
/// `samples` must be ascending, start at 0 and end at the last point index;
/// `classifications[i]` belongs to `samples[i]`. Each unsampled point takes
/// the type of the sample before it, and the step from point `i` to `i + 1`
/// is counted in the segment holding `i`.
pub fn merge_segments(
    points: &[TrackPoint],
    steps: &[f64],
    samples: &[usize],
    classifications: &[PointClassification],
) -> Vec<TerrainSegment> {
    let mut segments = Vec::new();
    let mut current: Option<SegmentBuilder> = None;

    for (slot, (&start, class)) in samples.iter().zip(classifications).enumerate() {
        let end = samples
            .get(slot + 1)
            .map_or(points.len() - 1, |next| next - 1);
        let last_step = (end + 1).min(steps.len());
        let distance: f64 = steps[start.min(last_step)..last_step].iter().sum();

        match current.as_mut() {
            Some(builder) if builder.terrain == class.terrain => {
                builder.absorb(end, distance, class.confidence);
            }
            _ => {
                if let Some(done) = current.take() {
                    segments.push(done.finish(points));
                }
                let mut builder = SegmentBuilder::new(start, class.terrain);
                builder.absorb(end, distance, class.confidence);
                current = Some(builder);
            }
        }
    }

    if let Some(done) = current {
        segments.push(done.finish(points));
    }
    segments
}

pub fn summarize(segments: &[TerrainSegment]) -> TerrainSummary {
    let mut distance_m_by_type: BTreeMap<TerrainType, f64> = BTreeMap::new();
    for segment in segments {
        *distance_m_by_type.entry(segment.terrain).or_insert(0.0) += segment.distance_m;
    }

    let total: f64 = distance_m_by_type.values().sum();
    let percentage_by_type = distance_m_by_type
        .iter()
        .map(|(terrain, distance)| {
            let pct = if total > 0.0 {
                distance / total * 100.0
            } else {
                0.0
            };
            (*terrain, pct)
        })
        .collect();

    // ties go to the type listed first
    let dominant = if total > 0.0 {
        distance_m_by_type
            .iter()
            .fold(None, |best: Option<(TerrainType, f64)>, (terrain, distance)| match best {
                Some((_, top)) if top >= *distance => best,
                _ => Some((*terrain, *distance)),
            })
            .map_or(TerrainType::Unknown, |(terrain, _)| terrain)
    } else {
        segments.first().map_or(TerrainType::Unknown, |s| s.terrain)
    };

    TerrainSummary {
        dominant,
        distance_m_by_type,
        percentage_by_type,
    }
}

/// True when the segments cover `0..len` contiguously without overlap.
pub fn covers_route(segments: &[TerrainSegment], len: usize) -> bool {
    if len == 0 {
        return segments.is_empty();
    }
    let mut expected_start = 0;
    for segment in segments {
        if segment.start_index != expected_start || segment.end_index < segment.start_index {
            return false;
        }
        expected_start = segment.end_index + 1;
    }
    expected_start == len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::process::step_distances;
    use crate::types::terrain::ClassificationSource;

    fn class(terrain: TerrainType, confidence: f64) -> PointClassification {
        PointClassification {
            terrain,
            confidence,
            source: ClassificationSource::Remote,
        }
    }

    fn line(len: usize) -> Vec<TrackPoint> {
        (0..len)
            .map(|i| TrackPoint::new(0.0, i as f64 * 0.001).with_elevation(i as f64))
            .collect()
    }

    #[test]
    fn sampling_keeps_first_and_last() {
        assert_eq!(sample_indices(11, 5, 50), vec![0, 5, 10]);
        assert_eq!(sample_indices(12, 5, 50), vec![0, 5, 10, 11]);
        assert_eq!(sample_indices(2, 10, 50), vec![0, 1]);
        assert_eq!(sample_indices(1, 10, 50), vec![0]);
        assert!(sample_indices(0, 10, 50).is_empty());
    }

    #[test]
    fn zero_stride_samples_every_point() {
        assert_eq!(sample_indices(4, 0, 50), vec![0, 1, 2, 3]);
    }

    #[test]
    fn sampling_respects_max_samples() {
        for len in [2, 3, 50, 51, 99, 100, 101, 1000, 4321] {
            let samples = sample_indices(len, 1, 10);
            assert!(samples.len() <= 10, "len {len} gave {}", samples.len());
            assert_eq!(samples[0], 0);
            assert_eq!(*samples.last().unwrap(), len - 1);
        }
    }

    #[test]
    fn adjacent_equal_types_merge_with_weighted_confidence() {
        let points = line(7);
        let steps = step_distances(&points);
        let samples = vec![0, 2, 4, 6];
        let classes = vec![
            class(TerrainType::Forest, 0.9),
            class(TerrainType::Forest, 0.5),
            class(TerrainType::Urban, 0.8),
            class(TerrainType::Urban, 0.8),
        ];

        let segments = merge_segments(&points, &steps, &samples, &classes);

        assert_eq!(segments.len(), 2);
        assert_eq!((segments[0].start_index, segments[0].end_index), (0, 3));
        assert_eq!((segments[1].start_index, segments[1].end_index), (4, 6));
        // both forest members span two equal steps
        assert!((segments[0].confidence - 0.7).abs() < 1e-9);
        let total: f64 = steps.iter().sum();
        let covered: f64 = segments.iter().map(|s| s.distance_m).sum();
        assert!((covered - total).abs() < 1e-6);
        assert_eq!(segments[0].average_elevation_m, Some(1.5));
        assert!(covers_route(&segments, points.len()));
    }

    #[test]
    fn trailing_single_point_segment_uses_plain_confidence() {
        let points = line(3);
        let steps = step_distances(&points);
        let segments = merge_segments(
            &points,
            &steps,
            &[0, 2],
            &[class(TerrainType::Rural, 0.8), class(TerrainType::Water, 0.9)],
        );

        assert_eq!(segments.len(), 2);
        assert_eq!((segments[1].start_index, segments[1].end_index), (2, 2));
        assert_eq!(segments[1].distance_m, 0.0);
        assert_eq!(segments[1].confidence, 0.9);
        assert!(covers_route(&segments, 3));
    }

    #[test]
    fn summary_percentages_and_dominant_type() {
        let segment = |terrain, distance_m| TerrainSegment {
            start_index: 0,
            end_index: 0,
            distance_m,
            terrain,
            average_elevation_m: None,
            confidence: 1.0,
        };
        let summary = summarize(&[
            segment(TerrainType::Forest, 300.0),
            segment(TerrainType::Urban, 500.0),
            segment(TerrainType::Forest, 400.0),
        ]);

        assert_eq!(summary.dominant, TerrainType::Forest);
        assert_eq!(summary.distance_m_by_type[&TerrainType::Forest], 700.0);
        let pct: f64 = summary.percentage_by_type.values().sum();
        assert!((pct - 100.0).abs() < 1e-9);
        assert!((summary.percentage_by_type[&TerrainType::Urban] - 41.666_666).abs() < 1e-3);
    }

    #[test]
    fn empty_summary_is_unknown() {
        let summary = summarize(&[]);
        assert_eq!(summary.dominant, TerrainType::Unknown);
        assert!(summary.distance_m_by_type.is_empty());
    }

    #[test]
    fn coverage_check_detects_gaps() {
        let segment = |start_index, end_index| TerrainSegment {
            start_index,
            end_index,
            distance_m: 0.0,
            terrain: TerrainType::Rural,
            average_elevation_m: None,
            confidence: 0.5,
        };
        assert!(covers_route(&[segment(0, 2), segment(3, 4)], 5));
        assert!(!covers_route(&[segment(0, 1), segment(3, 4)], 5));
        assert!(!covers_route(&[segment(0, 2), segment(2, 4)], 5));
        assert!(!covers_route(&[segment(0, 2)], 5));
    }
}
