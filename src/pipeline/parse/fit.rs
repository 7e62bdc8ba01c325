use crate::error::ParseError;
use crate::pipeline::parse::{check_coordinate, Parser};
use crate::types::activity::{Route, TrackFormat, TrackPoint};
use chrono::DateTime;
use fitparser::profile::MesgNum;

pub struct FitParser;

impl Parser for FitParser {
    fn parse(&self, bytes: &[u8]) -> Result<Route, ParseError> {
        let data = fitparser::from_bytes(bytes)
            .map_err(|e| ParseError::InvalidFit(format!("Failed to parse FIT file: {}", e)))?;

        let mut points = Vec::new();

        for record in data {
            if record.kind() != MesgNum::Record {
                continue;
            }

            let mut lat = None;
            let mut lon = None;
            let mut elevation = None;
            let mut time = None;

            for field in record.fields() {
                match (field.name(), field.value()) {
                    ("position_lat", fitparser::Value::SInt32(val)) => {
                        lat = Some(semicircles_to_degrees(*val));
                    }
                    ("position_long", fitparser::Value::SInt32(val)) => {
                        lon = Some(semicircles_to_degrees(*val));
                    }
                    ("altitude" | "enhanced_altitude", fitparser::Value::Float64(val)) => {
                        elevation = Some(*val);
                    }
                    ("altitude" | "enhanced_altitude", fitparser::Value::Float32(val)) => {
                        elevation = Some(f64::from(*val));
                    }
                    ("timestamp", fitparser::Value::Timestamp(val)) => {
                        time = DateTime::from_timestamp(val.timestamp(), 0);
                    }
                    _ => {}
                }
            }

            // records without a fix (indoor, GPS warm-up) carry no position
            let (Some(lat), Some(lon)) = (lat, lon) else {
                continue;
            };

            let index = points.len();
            points.push(TrackPoint {
                lat: check_coordinate(lat, "lat", index)?,
                lon: check_coordinate(lon, "lon", index)?,
                elevation,
                time,
            });
        }

        if points.is_empty() {
            return Err(ParseError::EmptyFile);
        }

        Ok(Route {
            points,
            format: TrackFormat::Fit,
        })
    }
}

fn semicircles_to_degrees(semicircles: i32) -> f64 {
    (semicircles as f64) * (180.0 / 2_147_483_648.0)
}
