//! Map style definitions.
//!
//! Every photo gets a style triple: a normal style, a highlight style with the
//! icon zoomed, and a style map pairing the two. The ids are derived from the
//! CRC32 of the photo's bytes, so two runs over unchanged files produce
//! identical documents.
//!
//! Path, gap, and polygon placemarks share three document-level styles.

use crate::config::{PathConfig, PlacemarkConfig};
use crate::kml::{IconStyle, LineStyle, PolyStyle, Style, StyleMap, StyleSelector};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub const PATH_STYLE: &str = "path";
pub const PATH_GAP_STYLE: &str = "pathGap";
pub const POLYGON_STYLE: &str = "polygon";

/// Icon used when the photo itself is not the symbol.
pub const DEFAULT_ICON: &str = "http://maps.google.com/mapfiles/kml/shapes/camera.png";

/// Balloon text that shows the placemark description.
const BALLOON_TEXT: &str = "$[description]";

/// CRC32 of a file's contents.
pub fn file_checksum(path: &Path) -> std::io::Result<u32> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = crc32fast::Hasher::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize())
}

/// Eight lowercase hex digits.
pub fn checksum_hex(crc: u32) -> String {
    format!("{crc:08x}")
}

/// `styleUrl` a photo placemark points at.
pub fn photo_style_url(crc: u32) -> String {
    format!("#{}", map_id(crc))
}

fn normal_id(crc: u32) -> String {
    format!("s{}", checksum_hex(crc))
}

fn highlight_id(crc: u32) -> String {
    format!("s{}_h", checksum_hex(crc))
}

fn map_id(crc: u32) -> String {
    format!("m{}", checksum_hex(crc))
}

/// Normal, highlight, and map styles for one photo.
pub fn photo_styles(crc: u32, config: &PlacemarkConfig, icon_href: &str) -> [StyleSelector; 3] {
    let style = |id: String, scale: f64| {
        StyleSelector::Style(Style {
            id,
            icon: Some(IconStyle {
                scale,
                href: icon_href.to_string(),
            }),
            balloon: Some(BALLOON_TEXT.to_string()),
            ..Style::default()
        })
    };
    [
        style(normal_id(crc), config.scale),
        style(highlight_id(crc), config.scale * config.zoom),
        StyleSelector::StyleMap(StyleMap {
            id: map_id(crc),
            normal: format!("#{}", normal_id(crc)),
            highlight: format!("#{}", highlight_id(crc)),
        }),
    ]
}

/// Shared styles for path, gap, and polygon placemarks.
pub fn track_styles(config: &PathConfig) -> Vec<StyleSelector> {
    let line = |id: &str, color: &str| {
        StyleSelector::Style(Style {
            id: id.to_string(),
            line: Some(LineStyle {
                color: color.to_string(),
                width: config.width,
            }),
            ..Style::default()
        })
    };
    vec![
        line(PATH_STYLE, &config.color),
        line(PATH_GAP_STYLE, &config.gap_color),
        StyleSelector::Style(Style {
            id: POLYGON_STYLE.to_string(),
            line: Some(LineStyle {
                color: config.polygon_color.clone(),
                width: config.width,
            }),
            poly: Some(PolyStyle {
                color: config.polygon_color.clone(),
            }),
            ..Style::default()
        }),
    ]
}
