use crate::error::ParseError;
use crate::pipeline::parse::{check_coordinate, Parser};
use crate::types::activity::{Route, TrackFormat, TrackPoint};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub struct GpxParser;

impl Parser for GpxParser {
    fn parse(&self, bytes: &[u8]) -> Result<Route, ParseError> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut points = Vec::new();
        let mut current_point: Option<TrackPoint> = None;
        let mut current_element = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = local_name(&e)?;
                    if is_point_element(&name) {
                        current_point = Some(read_point(&e, points.len())?);
                    } else if current_point.is_some() {
                        current_element = name;
                    }
                }
                Ok(Event::Empty(e)) => {
                    // <trkpt lat=".." lon=".."/> carries no children
                    if is_point_element(&local_name(&e)?) {
                        points.push(read_point(&e, points.len())?);
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(point) = current_point.as_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;

                        match current_element.as_str() {
                            "ele" => point.elevation = text.trim().parse().ok(),
                            "time" => point.time = text.trim().parse::<DateTime<Utc>>().ok(),
                            _ => {}
                        }
                    }
                }
                Ok(Event::End(e)) => {
                    let name = e.local_name();
                    let name_str = std::str::from_utf8(name.as_ref())
                        .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;

                    if is_point_element(name_str) {
                        if let Some(point) = current_point.take() {
                            points.push(point);
                        }
                    }
                    current_element.clear();
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ParseError::InvalidGpx(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        if points.is_empty() {
            return Err(ParseError::EmptyFile);
        }

        Ok(Route {
            points,
            format: TrackFormat::Gpx,
        })
    }
}

fn is_point_element(name: &str) -> bool {
    name == "trkpt" || name == "rtept"
}

fn local_name(e: &BytesStart<'_>) -> Result<String, ParseError> {
    let name = e.local_name();
    std::str::from_utf8(name.as_ref())
        .map(str::to_string)
        .map_err(|e| ParseError::InvalidGpx(e.to_string()))
}

fn read_point(e: &BytesStart<'_>, index: usize) -> Result<TrackPoint, ParseError> {
    let mut lat = None;
    let mut lon = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidGpx(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.local_name().into_inner())
            .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;
        let value = std::str::from_utf8(&attr.value)
            .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;

        match key {
            "lat" => lat = Some(parse_coordinate(value, "lat", index)?),
            "lon" => lon = Some(parse_coordinate(value, "lon", index)?),
            _ => {}
        }
    }

    let lat = lat.ok_or(ParseError::MissingCoordinate { index, field: "lat" })?;
    let lon = lon.ok_or(ParseError::MissingCoordinate { index, field: "lon" })?;
    Ok(TrackPoint::new(lat, lon))
}

fn parse_coordinate(value: &str, field: &'static str, index: usize) -> Result<f64, ParseError> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidCoordinate {
            index,
            field,
            value: value.to_string(),
        })?;
    check_coordinate(parsed, field, index)
}
