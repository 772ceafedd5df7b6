//! Photo metadata extraction.
//!
//! Turns a photo file into a [`PhotoRecord`]: where it was taken, when, and
//! how it is oriented. The binary EXIF parsing is delegated to a
//! [`MetadataReader`]; the production reader is [`ExifReader`]
//! (kamadak-exif), tests substitute a mock.
//!
//! ## Resolution rules
//!
//! - **Date**: EXIF `DateTimeOriginal`, then `DateTimeDigitized`, then the
//!   file's last-modified time.
//! - **Location**: the GPS fix when one is present and not the `0,0`
//!   sentinel. A `0,0` fix sets [`PhotoRecord::is_zero_coordinate`]; both that
//!   case and a missing GPS block fall back to the configured default
//!   coordinate, and neither counts as [`PhotoRecord::has_location`].
//! - A GPS block that exists but holds no parseable position is an error
//!   ([`ExtractError::GpsGeolocation`]) for that file only.
//! - A file without any EXIF block fails with [`ExtractError::NoExif`].
//!
//! Coordinates are truncated to six decimal places.

use crate::types::Coordinate;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use exif::{Context, In, Tag, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No EXIF data in {0}")]
    NoExif(PathBuf),
    #[error("GPS data without a usable location in {0}")]
    GpsGeolocation(PathBuf),
    #[error("Unreadable EXIF data in {path}: {message}")]
    Exif { path: PathBuf, message: String },
}

/// GPS block as read from a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GpsTags {
    Fix {
        lat: f64,
        lon: f64,
        altitude: Option<f64>,
        bearing: Option<f64>,
    },
    /// The block exists but its position cannot be decoded.
    Unusable,
}

/// Fields a [`MetadataReader`] extracts from one file's EXIF block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExifData {
    pub date_taken: Option<NaiveDateTime>,
    pub gps: Option<GpsTags>,
    /// EXIF orientation (1..=8), 1 when absent.
    pub orientation: u32,
    /// Pixel dimensions recorded in EXIF, if any.
    pub dimensions: Option<(u32, u32)>,
}

/// Reads raw EXIF fields from a photo.
pub trait MetadataReader {
    /// Fails with [`ExtractError::NoExif`] when the file carries no EXIF block.
    fn read(&self, path: &Path) -> Result<ExifData, ExtractError>;
}

/// Everything the document assembler needs to know about one photo.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    pub path: PathBuf,
    pub has_exif: bool,
    /// A GPS fix was present, including a `0,0` one.
    pub has_gps: bool,
    /// The GPS fix was the `0,0` sentinel and the default was used instead.
    pub is_zero_coordinate: bool,
    pub coordinate: Coordinate,
    pub altitude: Option<f64>,
    pub bearing: Option<f64>,
    pub date: NaiveDateTime,
    pub orientation: u32,
    pub dimensions: Option<(u32, u32)>,
}

impl PhotoRecord {
    /// A real, non-sentinel GPS fix was found.
    pub fn has_location(&self) -> bool {
        self.has_gps && !self.is_zero_coordinate
    }

    /// Orientations 5..=8 are rotated by 90 degrees.
    pub fn is_rotated(&self) -> bool {
        (5..=8).contains(&self.orientation)
    }
}

/// Extract a [`PhotoRecord`] from `path`.
///
/// `default` is the coordinate used when the photo has no usable fix.
pub fn extract(
    reader: &impl MetadataReader,
    path: &Path,
    default: Coordinate,
) -> Result<PhotoRecord, ExtractError> {
    let data = reader.read(path)?;

    let date = match data.date_taken {
        Some(date) => date,
        None => modified_time(path)?,
    };

    let (has_gps, is_zero_coordinate, coordinate, altitude, bearing) = match data.gps {
        Some(GpsTags::Fix {
            lat,
            lon,
            altitude,
            bearing,
        }) => {
            let fix = Coordinate::truncated(lat, lon);
            if fix.is_zero() {
                (true, true, default, None, None)
            } else {
                (true, false, fix, altitude, bearing)
            }
        }
        Some(GpsTags::Unusable) => return Err(ExtractError::GpsGeolocation(path.to_path_buf())),
        None => (false, false, default, None, None),
    };

    Ok(PhotoRecord {
        path: path.to_path_buf(),
        has_exif: true,
        has_gps,
        is_zero_coordinate,
        coordinate,
        altitude,
        bearing,
        date,
        orientation: data.orientation,
        dimensions: data.dimensions,
    })
}

fn modified_time(path: &Path) -> Result<NaiveDateTime, ExtractError> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}

// =============================================================================
// kamadak-exif reader
// =============================================================================

/// Production [`MetadataReader`] backed by kamadak-exif.
#[derive(Debug, Default)]
pub struct ExifReader;

impl ExifReader {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataReader for ExifReader {
    fn read(&self, path: &Path) -> Result<ExifData, ExtractError> {
        let file = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(file);
        let exif = match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => return Err(ExtractError::NoExif(path.to_path_buf())),
            Err(exif::Error::Io(e)) => return Err(ExtractError::Io(e)),
            Err(e) => {
                return Err(ExtractError::Exif {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        };

        Ok(ExifData {
            date_taken: date_taken(&exif),
            gps: gps_tags(&exif),
            orientation: orientation(&exif),
            dimensions: dimensions(&exif),
        })
    }
}

fn date_taken(exif: &exif::Exif) -> Option<NaiveDateTime> {
    [Tag::DateTimeOriginal, Tag::DateTimeDigitized]
        .into_iter()
        .find_map(|tag| parse_datetime_tag(exif, tag))
}

fn parse_datetime_tag(exif: &exif::Exif, tag: Tag) -> Option<NaiveDateTime> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Ascii(ref vec) = field.value else {
        return None;
    };
    let dt = exif::DateTime::from_ascii(vec.first()?).ok()?;
    let date = NaiveDate::from_ymd_opt(dt.year as i32, dt.month as u32, dt.day as u32)?;
    let time = NaiveTime::from_hms_opt(dt.hour as u32, dt.minute as u32, dt.second as u32)?;
    Some(NaiveDateTime::new(date, time))
}

fn orientation(exif: &exif::Exif) -> u32 {
    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .filter(|v| (1..=8).contains(v))
        .unwrap_or(1)
}

fn dimensions(exif: &exif::Exif) -> Option<(u32, u32)> {
    let width = exif
        .get_field(Tag::PixelXDimension, In::PRIMARY)?
        .value
        .get_uint(0)?;
    let height = exif
        .get_field(Tag::PixelYDimension, In::PRIMARY)?
        .value
        .get_uint(0)?;
    (width > 0 && height > 0).then_some((width, height))
}

fn gps_tags(exif: &exif::Exif) -> Option<GpsTags> {
    let has_gps_block = exif.fields().any(|f| f.tag.context() == Context::Gps);
    if !has_gps_block {
        return None;
    }
    let position = signed_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S")
        .zip(signed_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W"));
    let Some((lat, lon)) = position else {
        return Some(GpsTags::Unusable);
    };
    Some(GpsTags::Fix {
        lat,
        lon,
        altitude: altitude(exif),
        bearing: first_rational(exif, Tag::GPSImgDirection),
    })
}

/// Decimal degrees with the sign taken from the N/S or E/W reference tag.
fn signed_coordinate(
    exif: &exif::Exif,
    tag: Tag,
    ref_tag: Tag,
    negative_ref: &str,
) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let magnitude = dms_to_degrees(&field.value)?;
    let negative = exif.get_field(ref_tag, In::PRIMARY).is_some_and(|r| {
        r.value
            .display_as(ref_tag)
            .to_string()
            .trim()
            .eq_ignore_ascii_case(negative_ref)
    });
    Some(if negative { -magnitude } else { magnitude })
}

/// Degrees/minutes/seconds rationals to decimal degrees.
fn dms_to_degrees(value: &Value) -> Option<f64> {
    let Value::Rational(rats) = value else {
        return None;
    };
    if rats.len() < 3 || rats.iter().take(3).any(|r| r.denom == 0) {
        return None;
    }
    Some(rats[0].to_f64() + rats[1].to_f64() / 60.0 + rats[2].to_f64() / 3600.0)
}

fn first_rational(exif: &exif::Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match field.value {
        Value::Rational(ref rats) if rats.first().is_some_and(|r| r.denom != 0) => {
            Some(rats[0].to_f64())
        }
        _ => None,
    }
}

fn altitude(exif: &exif::Exif) -> Option<f64> {
    let alt = first_rational(exif, Tag::GPSAltitude)?;
    let below_sea_level = exif
        .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        == Some(1);
    Some(if below_sea_level { -alt } else { alt })
}
