//! KML serialization.
//!
//! Renders a [`Document`] to KML 2.2 text with
//! [maud](https://maud.lambda.xyz/). Element names are written exactly as KML
//! spells them (`Placemark`, `styleUrl`, `outerBoundaryIs`).
//!
//! ## Output shape
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <kml xmlns="http://www.opengis.net/kml/2.2">
//!   <Document>
//!     <name/> <description/> <open>1</open>
//!     <Style/> <StyleMap/> ...        shared and per-photo styles
//!     <Folder> ... </Folder>          images, Path, Path Gap, Polygons
//!   </Document>
//! </kml>
//! ```
//!
//! ## Escaping
//!
//! Descriptions are inserted verbatim; they are CDATA-wrapped upstream when
//! they carry markup. Everything else goes through maud's escaping, after
//! which every `&lt;` and `&gt;` in the document is turned back into a literal
//! `<` and `>`. Map viewers rely on this to render HTML in names and
//! balloons. `&amp;` and `&quot;` are left as they are.

use crate::kml::{Document, Feature, FolderId, Geometry, Placemark, StyleSelector, TimePrimitive};
use crate::types::Coordinate;
use chrono::NaiveDateTime;
use maud::{Markup, PreEscaped, html};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Render the document to KML text.
pub fn render_kml(doc: &Document) -> String {
    let root = doc.folder(doc.root());
    let markup = html! {
        (PreEscaped(XML_DECLARATION))
        kml xmlns=(KML_NAMESPACE) {
            Document {
                name { (root.name) }
                @if let Some(description) = &root.description {
                    description { (PreEscaped(description)) }
                }
                open { "1" }
                @for style in &doc.styles {
                    (render_style(style))
                }
                (render_features(doc, doc.root()))
            }
        }
    };
    unescape_angle_brackets(&markup.into_string())
}

fn unescape_angle_brackets(text: &str) -> String {
    text.replace("&lt;", "<").replace("&gt;", ">")
}

// ============================================================================
// KML Components
// ============================================================================

fn render_style(style: &StyleSelector) -> Markup {
    match style {
        StyleSelector::Style(style) => html! {
            Style id=(style.id) {
                @if let Some(icon) = &style.icon {
                    IconStyle {
                        scale { (icon.scale) }
                        Icon { href { (icon.href) } }
                    }
                }
                @if let Some(balloon) = &style.balloon {
                    BalloonStyle { text { (balloon) } }
                }
                @if let Some(line) = &style.line {
                    LineStyle {
                        color { (line.color) }
                        width { (line.width) }
                    }
                }
                @if let Some(poly) = &style.poly {
                    PolyStyle { color { (poly.color) } }
                }
            }
        },
        StyleSelector::StyleMap(map) => html! {
            StyleMap id=(map.id) {
                Pair {
                    key { "normal" }
                    styleUrl { (map.normal) }
                }
                Pair {
                    key { "highlight" }
                    styleUrl { (map.highlight) }
                }
            }
        },
    }
}

fn render_features(doc: &Document, id: FolderId) -> Markup {
    html! {
        @for feature in &doc.folder(id).features {
            @match feature {
                Feature::Folder(child) => (render_folder(doc, *child)),
                Feature::Placemark(placemark) => (render_placemark(placemark)),
            }
        }
    }
}

fn render_folder(doc: &Document, id: FolderId) -> Markup {
    let folder = doc.folder(id);
    html! {
        Folder {
            name { (folder.name) }
            @if let Some(description) = &folder.description {
                description { (PreEscaped(description)) }
            }
            @if folder.open {
                open { "1" }
            }
            (render_features(doc, id))
        }
    }
}

fn render_placemark(placemark: &Placemark) -> Markup {
    html! {
        Placemark {
            @if let Some(name) = &placemark.name {
                name { (name) }
            }
            @if let Some(description) = &placemark.description {
                description { (PreEscaped(description)) }
            }
            @if let Some(time) = &placemark.time {
                (render_time(time))
            }
            @if let Some(style_url) = &placemark.style_url {
                styleUrl { (style_url) }
            }
            (render_geometry(&placemark.geometry))
        }
    }
}

fn render_time(time: &TimePrimitive) -> Markup {
    match time {
        TimePrimitive::Stamp(when) => html! {
            TimeStamp { when { (timestamp(when)) } }
        },
        TimePrimitive::Span { begin, end } => html! {
            TimeSpan {
                begin { (timestamp(begin)) }
                end { (timestamp(end)) }
            }
        },
    }
}

fn render_geometry(geometry: &Geometry) -> Markup {
    match geometry {
        Geometry::Point(point) => html! {
            Point { coordinates { (point.to_kml()) } }
        },
        Geometry::LineString(points) => html! {
            LineString { coordinates { (coordinates(points)) } }
        },
        Geometry::Polygon(ring) => html! {
            Polygon {
                outerBoundaryIs {
                    LinearRing { coordinates { (coordinates(&closed(ring))) } }
                }
            }
        },
    }
}

fn timestamp(time: &NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn coordinates(points: &[Coordinate]) -> String {
    points
        .iter()
        .map(|p| p.to_kml())
        .collect::<Vec<_>>()
        .join(" ")
}

fn closed(ring: &[Coordinate]) -> Vec<Coordinate> {
    let mut closed = ring.to_vec();
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if first != last => closed.push(*first),
        _ => {}
    }
    closed
}
