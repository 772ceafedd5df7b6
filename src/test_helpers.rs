//! Shared test utilities.
//!
//! Fixture builders for photo files and lookup helpers for the output tree.
//!
//! ```ignore
//! let bytes = jpeg_with_exif(&ExifSpec {
//!     date_taken: Some("2020:05:01 10:00:00"),
//!     gps: Some((52.1, 4.3)),
//!     ..ExifSpec::default()
//! });
//! ```

use crate::kml::{Document, Feature, Folder, FolderId, Placemark};
use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

// =========================================================================
// Photo fixtures
// =========================================================================

/// Encode a solid-color JPEG without any metadata.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([120, 80, 40]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

/// EXIF fields to embed in a fixture JPEG.
#[derive(Debug, Clone, Default)]
pub struct ExifSpec {
    /// `YYYY:MM:DD HH:MM:SS`
    pub date_taken: Option<&'static str>,
    /// Signed decimal degrees `(lat, lon)`.
    pub gps: Option<(f64, f64)>,
    pub orientation: Option<u16>,
}

/// A JPEG with an APP1 EXIF segment built from `spec`.
pub fn jpeg_with_exif(spec: &ExifSpec) -> Vec<u8> {
    let mut fields = vec![Field {
        tag: Tag::Orientation,
        ifd_num: In::PRIMARY,
        value: Value::Short(vec![spec.orientation.unwrap_or(1)]),
    }];
    if let Some(date) = spec.date_taken {
        fields.push(Field {
            tag: Tag::DateTimeOriginal,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![date.as_bytes().to_vec()]),
        });
    }
    if let Some((lat, lon)) = spec.gps {
        let lat_ref = if lat < 0.0 { "S" } else { "N" };
        let lon_ref = if lon < 0.0 { "W" } else { "E" };
        fields.extend([
            Field {
                tag: Tag::GPSLatitudeRef,
                ifd_num: In::PRIMARY,
                value: Value::Ascii(vec![lat_ref.as_bytes().to_vec()]),
            },
            Field {
                tag: Tag::GPSLatitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(dms(lat)),
            },
            Field {
                tag: Tag::GPSLongitudeRef,
                ifd_num: In::PRIMARY,
                value: Value::Ascii(vec![lon_ref.as_bytes().to_vec()]),
            },
            Field {
                tag: Tag::GPSLongitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(dms(lon)),
            },
        ]);
    }

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let jpeg = jpeg_bytes(16, 12);
    let segment_len = (2 + 6 + tiff.len()) as u16;
    let mut out = Vec::with_capacity(jpeg.len() + tiff.len() + 10);
    out.extend_from_slice(&jpeg[..2]); // SOI
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn dms(value: f64) -> Vec<Rational> {
    let value = value.abs();
    let degrees = value.trunc();
    let minutes = ((value - degrees) * 60.0).trunc();
    let seconds = ((value - degrees) * 60.0 - minutes) * 60.0;
    vec![
        Rational::from((degrees as u32, 1)),
        Rational::from((minutes as u32, 1)),
        Rational::from(((seconds * 1000.0).round() as u32, 1000)),
    ]
}

// =========================================================================
// Output tree lookups, panicking with a clear message on miss
// =========================================================================

/// Find a direct sub-folder by name. Panics if not found.
pub fn find_folder<'a>(doc: &'a Document, parent: FolderId, name: &str) -> &'a Folder {
    doc.child_folder(parent, name).map(|id| doc.folder(id)).unwrap_or_else(|| {
        panic!(
            "folder '{name}' not found under '{}'. Available: {:?}",
            doc.folder(parent).name,
            folder_names(doc, parent)
        )
    })
}

/// Names of the direct sub-folders of `parent`, in order.
pub fn folder_names(doc: &Document, parent: FolderId) -> Vec<&str> {
    doc.folder(parent)
        .features
        .iter()
        .filter_map(|f| match f {
            Feature::Folder(id) => Some(doc.folder(*id).name.as_str()),
            Feature::Placemark(_) => None,
        })
        .collect()
}

/// Direct placemarks of a folder, in order.
pub fn placemarks(folder: &Folder) -> Vec<&Placemark> {
    folder
        .features
        .iter()
        .filter_map(|f| match f {
            Feature::Placemark(p) => Some(p),
            Feature::Folder(_) => None,
        })
        .collect()
}
