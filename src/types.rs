//! Shared types used across the conversion components.

use chrono::NaiveDateTime;
use std::fmt::Write;

/// Number of decimal digits kept in emitted coordinates.
const COORDINATE_DIGITS: i32 = 6;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a coordinate truncated (not rounded) to six decimal places.
    pub fn truncated(lat: f64, lon: f64) -> Self {
        Self {
            lat: truncate_digits(lat),
            lon: truncate_digits(lon),
        }
    }

    /// The `0,0` sentinel some cameras write when they have no fix.
    pub fn is_zero(&self) -> bool {
        self.lat == 0.0 && self.lon == 0.0
    }

    /// KML `lon,lat` tuple.
    pub fn to_kml(self) -> String {
        format!("{},{}", self.lon, self.lat)
    }
}

impl From<Coordinate> for geo::Coord<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Coord { x: c.lon, y: c.lat }
    }
}

impl From<geo::Coord<f64>> for Coordinate {
    fn from(c: geo::Coord<f64>) -> Self {
        Self { lat: c.y, lon: c.x }
    }
}

/// Format `time` with a strftime `pattern`.
///
/// Fails instead of panicking when the pattern is well-formed but asks for
/// something a naive timestamp lacks, such as `%z`.
pub fn format_date(time: &NaiveDateTime, pattern: &str) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    write!(out, "{}", time.format(pattern))?;
    Ok(out)
}

fn truncate_digits(value: f64) -> f64 {
    let factor = 10f64.powi(COORDINATE_DIGITS);
    (value * factor).trunc() / factor
}
