use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
    pub time: Option<DateTime<Utc>>,
}

impl TrackPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elevation: None,
            time: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackFormat {
    Gpx,
    Fit,
}

impl TrackFormat {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit('.').next()?.to_lowercase();
        match ext.as_str() {
            "gpx" => Some(TrackFormat::Gpx),
            "fit" => Some(TrackFormat::Fit),
            _ => None,
        }
    }

    /// Guesses the format from the leading bytes of a document.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.len() >= 12 && &bytes[8..12] == b".FIT" {
            return Some(TrackFormat::Fit);
        }
        let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(bytes);
        body.iter()
            .find(|b| !b.is_ascii_whitespace())
            .filter(|b| **b == b'<')
            .map(|_| TrackFormat::Gpx)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackFormat::Gpx => "gpx",
            TrackFormat::Fit => "fit",
        }
    }
}

/// Recorded points in recording order.
#[derive(Debug, Clone)]
pub struct Route {
    pub points: Vec<TrackPoint>,
    pub format: TrackFormat,
}

impl Route {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.points.iter().find_map(|p| p.time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Midpoint of the box, used as the representative location of a ride.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideMetrics {
    pub distance_m: f64,
    pub duration_seconds: u64,
    pub elevation_gain_m: Option<f64>,
    pub elevation_loss_m: Option<f64>,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: Option<f64>,
    /// Initial bearing from the first to the last point.
    pub heading_degrees: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub point_count: usize,
    pub bounding_box: BoundingBox,
}

impl RideMetrics {
    pub fn duration_hours(&self) -> f64 {
        self.duration_seconds as f64 / 3600.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_filename_is_case_insensitive() {
        assert_eq!(TrackFormat::from_filename("ride.GPX"), Some(TrackFormat::Gpx));
        assert_eq!(TrackFormat::from_filename("ride.fit"), Some(TrackFormat::Fit));
        assert_eq!(TrackFormat::from_filename("ride.csv"), None);
    }

    #[test]
    fn sniff_detects_xml_and_fit_headers() {
        assert_eq!(
            TrackFormat::sniff(b"\n  <?xml version=\"1.0\"?><gpx/>"),
            Some(TrackFormat::Gpx)
        );
        let mut fit = vec![14u8, 0x10, 0, 0, 0, 0, 0, 0];
        fit.extend_from_slice(b".FIT");
        assert_eq!(TrackFormat::sniff(&fit), Some(TrackFormat::Fit));
        assert_eq!(TrackFormat::sniff(b"lat,lon"), None);
    }

    #[test]
    fn bounding_box_center_is_midpoint() {
        let bbox = BoundingBox {
            min_lat: 10.0,
            max_lat: 20.0,
            min_lon: -4.0,
            max_lon: 2.0,
        };
        assert_eq!(bbox.center(), (15.0, -1.0));
    }
}
