mod fit;
mod gpx;

use crate::error::ParseError;
use crate::types::activity::{Route, TrackFormat};

pub trait Parser {
    fn parse(&self, bytes: &[u8]) -> Result<Route, ParseError>;
}

/// Parses a track document into a [`Route`]. When `format` is `None` the
/// format is sniffed from the document itself.
pub fn parse(bytes: &[u8], format: Option<TrackFormat>) -> Result<Route, ParseError> {
    let format = format
        .or_else(|| TrackFormat::sniff(bytes))
        .ok_or(ParseError::UnknownFormat)?;

    let route = match format {
        TrackFormat::Gpx => gpx::GpxParser.parse(bytes)?,
        TrackFormat::Fit => fit::FitParser.parse(bytes)?,
    };
    check_time_order(&route)?;

    tracing::debug!(
        "Parsed {} track with {} points",
        format.as_str(),
        route.points.len()
    );
    Ok(route)
}

pub(crate) fn check_coordinate(
    value: f64,
    field: &'static str,
    index: usize,
) -> Result<f64, ParseError> {
    let limit = if field == "lat" { 90.0 } else { 180.0 };
    if !value.is_finite() || value.abs() > limit {
        return Err(ParseError::CoordinateOutOfRange {
            index,
            field,
            value,
        });
    }
    Ok(value)
}

fn check_time_order(route: &Route) -> Result<(), ParseError> {
    let mut last = None;
    for (index, point) in route.points.iter().enumerate() {
        let Some(time) = point.time else {
            continue;
        };
        if last.is_some_and(|prev| time < prev) {
            return Err(ParseError::TimestampsOutOfOrder { index });
        }
        last = Some(time);
    }
    Ok(())
}
