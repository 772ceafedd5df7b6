//! End-to-end runs over real JPEG files with EXIF metadata.

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use mapollage::cancel::CancelToken;
use mapollage::config::{self, Profile};
use mapollage::imaging::RustBackend;
use mapollage::kml::{Document, Feature, Geometry};
use mapollage::metadata::ExifReader;
use mapollage::pipeline::{self, RunOutcome, RunReport};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

fn plain_jpeg() -> Vec<u8> {
    let img = RgbImage::from_pixel(16, 12, Rgb([40, 90, 160]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

fn degrees(value: f64) -> Value {
    let value = value.abs();
    let d = value.trunc();
    let m = ((value - d) * 60.0).trunc();
    let s = ((value - d) * 60.0 - m) * 60.0;
    Value::Rational(vec![
        Rational::from((d as u32, 1)),
        Rational::from((m as u32, 1)),
        Rational::from(((s * 100.0).round() as u32, 100)),
    ])
}

fn ascii(text: &str) -> Value {
    Value::Ascii(vec![text.as_bytes().to_vec()])
}

/// A 16x12 JPEG taken at `date` (`YYYY:MM:DD HH:MM:SS`) and `lat, lon`.
fn geotagged_jpeg(date: &str, lat: f64, lon: f64) -> Vec<u8> {
    let fields = [
        (Tag::DateTimeOriginal, ascii(date)),
        (Tag::GPSLatitudeRef, ascii(if lat < 0.0 { "S" } else { "N" })),
        (Tag::GPSLatitude, degrees(lat)),
        (Tag::GPSLongitudeRef, ascii(if lon < 0.0 { "W" } else { "E" })),
        (Tag::GPSLongitude, degrees(lon)),
    ]
    .map(|(tag, value)| Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    });
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let jpeg = plain_jpeg();
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn write(root: &Path, name: &str, bytes: &[u8]) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

/// Two photos in `north`, one in `south`, and one without EXIF.
fn setup() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let photos = tmp.path().join("photos");
    write(&photos, "north/a.jpg", &geotagged_jpeg("2021:05:01 10:00:00", 52.5, 4.5));
    write(&photos, "north/b.jpg", &geotagged_jpeg("2021:05:01 12:00:00", 52.75, 4.25));
    write(&photos, "south/c.jpg", &geotagged_jpeg("2021:05:03 09:00:00", -33.5, 18.5));
    write(&photos, "plain.jpg", &plain_jpeg());
    tmp
}

fn profile(tmp: &TempDir) -> Profile {
    let overlay: toml::Value = toml::from_str(&format!(
        r#"
dest = "{dest}"

[source]
dir = "{source}"

[folder]
by = "dir"
root_name = "Holiday"

[path]
draw = true
draw_polygon = true
split_by = "day"

[photo]
reference = "thumbnail"
"#,
        dest = tmp.path().join("out").join("trip.kml").display(),
        source = tmp.path().join("photos").display(),
    ))
    .unwrap();
    config::resolve_profile(Some(overlay)).unwrap()
}

fn run(profile: &Profile) -> RunReport {
    let outcome = pipeline::run(
        profile,
        &ExifReader::new(),
        &RustBackend::new(),
        &CancelToken::new(),
        None,
    )
    .unwrap();
    match outcome {
        RunOutcome::Completed(report) => report,
        RunOutcome::Aborted { reason, .. } => panic!("run aborted: {reason:?}"),
    }
}

fn folder_names(doc: &Document, id: mapollage::kml::FolderId) -> Vec<String> {
    doc.folder(id)
        .features
        .iter()
        .filter_map(|f| match f {
            Feature::Folder(child) => Some(doc.folder(*child).name.clone()),
            Feature::Placemark(_) => None,
        })
        .collect()
}

#[test]
fn full_run_builds_folders_path_and_polygons() {
    let tmp = setup();
    let report = run(&profile(&tmp));
    let doc = &report.document;
    let root = doc.root();

    assert_eq!(report.summary.files, 4);
    assert_eq!(report.summary.exif, 3);
    assert_eq!(report.summary.gps, 3);
    assert_eq!(report.summary.placemarks, 3);
    assert_eq!(report.summary.errors, 1);

    assert_eq!(doc.folder(root).name, "Holiday");
    assert_eq!(folder_names(doc, root), vec!["Images", "Path", "Path Gap", "Polygons"]);
    let images = doc.child_folder(root, "Images").unwrap();
    assert_eq!(folder_names(doc, images), vec!["north", "south"]);
    assert_eq!(doc.placemark_count(doc.child_folder(images, "north").unwrap()), 2);
    assert_eq!(doc.placemark_count(doc.child_folder(images, "south").unwrap()), 1);
    assert_eq!(doc.placemark_count(doc.child_folder(root, "Path").unwrap()), 1);
    assert_eq!(doc.placemark_count(doc.child_folder(root, "Path Gap").unwrap()), 1);

    assert!(report.kml.contains(
        "<Placemark><name>Images</name><styleUrl>#polygon</styleUrl><Polygon>"
    ));
}

#[test]
fn gps_positions_reach_the_placemarks() {
    let tmp = setup();
    let report = run(&profile(&tmp));
    let doc = &report.document;
    let images = doc.child_folder(doc.root(), "Images").unwrap();
    let south = doc.child_folder(images, "south").unwrap();

    let Feature::Placemark(c) = &doc.folder(south).features[0] else {
        panic!("expected a placemark");
    };
    let Geometry::Point(point) = c.geometry else {
        panic!("expected a point");
    };
    assert!((point.lat + 33.5).abs() < 1e-5);
    assert!((point.lon - 18.5).abs() < 1e-5);
}

#[test]
fn thumbnails_are_written_beside_the_kml() {
    let tmp = setup();
    let profile = profile(&tmp);
    let report = run(&profile);

    let thumbs = tmp.path().join("out").join("trip-thumbnails");
    let mut entries: Vec<_> = fs::read_dir(&thumbs)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    entries.sort();
    assert_eq!(entries.len(), 3);
    for thumb in &entries {
        // 16x12 is within the limits and gets a 3px border
        assert_eq!(image::image_dimensions(thumb).unwrap(), (22, 18));
        let name = thumb.file_name().unwrap().to_string_lossy().into_owned();
        assert!(report.kml.contains(&format!("src=\"trip-thumbnails/{name}\"")));
    }
    assert_eq!(fs::read_to_string(&profile.dest).unwrap(), report.kml);
}

#[test]
fn second_run_produces_identical_kml() {
    let tmp = setup();
    let profile = profile(&tmp);
    let first = run(&profile);
    let second = run(&profile);
    assert_eq!(first.kml, second.kml);
}

#[test]
fn single_file_source() {
    let tmp = setup();
    let mut profile = profile(&tmp);
    profile.source.dir = tmp.path().join("photos").join("north").join("a.jpg");

    let report = run(&profile);
    assert_eq!(report.summary.files, 1);
    assert_eq!(report.summary.placemarks, 1);
    assert!(report.document.child_folder(report.document.root(), "Path").is_none());
}
