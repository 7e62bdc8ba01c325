use crate::error::ValidationError;
use crate::pipeline::geo::{haversine_distance, initial_bearing};
use crate::types::activity::{BoundingBox, RideMetrics, Route, TrackPoint};

pub fn compute_metrics(route: &Route) -> Result<RideMetrics, ValidationError> {
    let points = &route.points;
    if points.len() < 2 {
        return Err(ValidationError::InsufficientPoints(points.len()));
    }

    let mut distance_m = 0.0;
    let mut max_speed_kmh: Option<f64> = None;

    for pair in points.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let step = haversine_distance(prev.lat, prev.lon, curr.lat, curr.lon);
        distance_m += step;

        if let (Some(prev_time), Some(curr_time)) = (prev.time, curr.time) {
            let dt = (curr_time - prev_time).num_milliseconds();
            if dt > 0 {
                let speed = step / (dt as f64 / 1000.0) * 3.6;
                max_speed_kmh = Some(max_speed_kmh.map_or(speed, |max| max.max(speed)));
            }
        }
    }

    let (elevation_gain_m, elevation_loss_m) = elevation_change(points);

    let start_time = points.iter().find_map(|p| p.time);
    let end_time = points.iter().rev().find_map(|p| p.time);
    let duration_seconds = match (start_time, end_time) {
        (Some(start), Some(end)) => (end - start).num_seconds().max(0) as u64,
        _ => 0,
    };

    let avg_speed_kmh = if duration_seconds > 0 {
        (distance_m / duration_seconds as f64) * 3.6
    } else {
        0.0
    };

    let first = &points[0];
    let last = &points[points.len() - 1];
    let heading_degrees = if first.lat == last.lat && first.lon == last.lon {
        None
    } else {
        Some(initial_bearing(first.lat, first.lon, last.lat, last.lon))
    };

    Ok(RideMetrics {
        distance_m,
        duration_seconds,
        elevation_gain_m,
        elevation_loss_m,
        avg_speed_kmh,
        max_speed_kmh,
        heading_degrees,
        start_time,
        end_time,
        point_count: points.len(),
        bounding_box: bounding_box(points),
    })
}

/// Sums positive and negative deltas between consecutive elevation-bearing
/// points. `None` when no point has an elevation.
fn elevation_change(points: &[TrackPoint]) -> (Option<f64>, Option<f64>) {
    let mut elevations = points.iter().filter_map(|p| p.elevation);
    let Some(mut prev) = elevations.next() else {
        return (None, None);
    };

    let mut gain = 0.0;
    let mut loss = 0.0;
    for ele in elevations {
        let delta = ele - prev;
        if delta > 0.0 {
            gain += delta;
        } else {
            loss -= delta;
        }
        prev = ele;
    }
    (Some(gain), Some(loss))
}

fn bounding_box(points: &[TrackPoint]) -> BoundingBox {
    points.iter().fold(
        BoundingBox {
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
        },
        |bbox, p| BoundingBox {
            min_lat: bbox.min_lat.min(p.lat),
            max_lat: bbox.max_lat.max(p.lat),
            min_lon: bbox.min_lon.min(p.lon),
            max_lon: bbox.max_lon.max(p.lon),
        },
    )
}

/// Great-circle distance of every consecutive pair, indexed by the first
/// point of the pair.
pub fn step_distances(points: &[TrackPoint]) -> Vec<f64> {
    points
        .windows(2)
        .map(|pair| haversine_distance(pair[0].lat, pair[0].lon, pair[1].lat, pair[1].lon))
        .collect()
}
