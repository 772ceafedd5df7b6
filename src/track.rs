//! Travel path built from located photos.
//!
//! Fixes are sorted by time and partitioned into buckets by the configured
//! granularity. Each bucket with at least two fixes becomes one path line;
//! every pair of consecutive buckets is bridged by a two-point gap line from
//! the last fix of the earlier bucket to the first fix of the later one.
//!
//! | Split | Bucket key |
//! |---|---|
//! | `none` | one global bucket |
//! | `hour` | `%Y%m%d%H` |
//! | `day` | `%Y%m%d` |
//! | `week` | `%G%V` (ISO week-numbering year and week) |
//! | `month` | `%Y%m` |
//! | `year` | `%Y` |
//!
//! Keys sort lexicographically in chronological order.

use crate::config::SplitBy;
use crate::kml::{Document, FolderId, Geometry, Placemark, TimePrimitive};
use crate::style::{PATH_GAP_STYLE, PATH_STYLE};
use crate::types::Coordinate;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

pub const PATH_FOLDER: &str = "Path";
pub const PATH_GAP_FOLDER: &str = "Path Gap";

const NAME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One fix on the travel path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineNode {
    pub time: NaiveDateTime,
    pub coordinate: Coordinate,
}

/// Path and gap lines, in chronological order.
#[derive(Debug, Default)]
pub struct Segments {
    pub paths: Vec<Placemark>,
    pub gaps: Vec<Placemark>,
}

/// Bucket key of `time` for a split granularity.
pub fn bucket_key(split: SplitBy, time: &NaiveDateTime) -> String {
    let pattern = match split {
        SplitBy::None => return String::new(),
        SplitBy::Hour => "%Y%m%d%H",
        SplitBy::Day => "%Y%m%d",
        SplitBy::Week => "%G%V",
        SplitBy::Month => "%Y%m",
        SplitBy::Year => "%Y",
    };
    time.format(pattern).to_string()
}

/// Split `nodes` into path and gap lines. Fewer than two nodes yield nothing.
pub fn build_segments(nodes: &[LineNode], split: SplitBy) -> Segments {
    let mut segments = Segments::default();
    if nodes.len() < 2 {
        return segments;
    }

    let mut sorted = nodes.to_vec();
    sorted.sort_by_key(|n| n.time);

    let mut buckets: BTreeMap<String, Vec<LineNode>> = BTreeMap::new();
    for node in sorted {
        buckets
            .entry(bucket_key(split, &node.time))
            .or_default()
            .push(node);
    }

    let mut previous: Option<LineNode> = None;
    for bucket in buckets.values() {
        let (Some(first), Some(last)) = (bucket.first(), bucket.last()) else {
            continue;
        };
        if let Some(prev) = previous {
            segments.gaps.push(line(&[prev, *first], PATH_GAP_STYLE));
        }
        if bucket.len() >= 2 {
            segments.paths.push(line(bucket, PATH_STYLE));
        }
        previous = Some(*last);
    }

    tracing::debug!(
        paths = segments.paths.len(),
        gaps = segments.gaps.len(),
        "Built path segments"
    );
    segments
}

fn line(nodes: &[LineNode], style: &str) -> Placemark {
    let begin = nodes[0].time;
    let end = nodes[nodes.len() - 1].time;
    let mut placemark = Placemark::new(Geometry::LineString(
        nodes.iter().map(|n| n.coordinate).collect(),
    ));
    placemark.name = Some(format!(
        "{} - {}",
        begin.format(NAME_FORMAT),
        end.format(NAME_FORMAT)
    ));
    placemark.time = Some(TimePrimitive::Span { begin, end });
    placemark.style_url = Some(format!("#{style}"));
    placemark
}

/// Append the `Path` and `Path Gap` folders to `parent`, skipping empty ones.
pub fn add_path_folders(doc: &mut Document, parent: FolderId, segments: Segments) {
    for (name, placemarks) in [
        (PATH_FOLDER, segments.paths),
        (PATH_GAP_FOLDER, segments.gaps),
    ] {
        if placemarks.is_empty() {
            continue;
        }
        let folder = doc.add_folder(parent, name);
        for placemark in placemarks {
            doc.add_placemark(folder, placemark);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tests::at;
    use crate::test_helpers::{folder_names, placemarks};

    fn node(time: &str, lat: f64, lon: f64) -> LineNode {
        LineNode {
            time: at(time),
            coordinate: Coordinate::new(lat, lon),
        }
    }

    fn points(placemark: &Placemark) -> Vec<Coordinate> {
        match &placemark.geometry {
            Geometry::LineString(points) => points.clone(),
            other => panic!("expected a line, got {other:?}"),
        }
    }

    #[test]
    fn single_node_builds_nothing() {
        let segments = build_segments(&[node("2020-01-01 10:00:00", 1.0, 1.0)], SplitBy::None);
        assert!(segments.paths.is_empty());
        assert!(segments.gaps.is_empty());
    }

    #[test]
    fn no_split_is_one_segment() {
        let nodes = [
            node("2020-01-01 10:00:00", 1.0, 1.0),
            node("2021-06-01 10:00:00", 2.0, 2.0),
            node("2022-01-01 10:00:00", 3.0, 3.0),
        ];
        let segments = build_segments(&nodes, SplitBy::None);
        assert_eq!(segments.paths.len(), 1);
        assert!(segments.gaps.is_empty());
        assert_eq!(points(&segments.paths[0]).len(), 3);
    }

    #[test]
    fn one_fix_per_bucket_gives_only_gaps() {
        let nodes = [
            node("2020-01-01 10:00:00", 1.0, 1.0),
            node("2020-01-01 11:00:00", 2.0, 2.0),
            node("2020-01-01 12:00:00", 3.0, 3.0),
            node("2020-01-01 13:00:00", 4.0, 4.0),
        ];
        let segments = build_segments(&nodes, SplitBy::Hour);
        assert!(segments.paths.is_empty());
        assert_eq!(segments.gaps.len(), 3);
    }

    #[test]
    fn same_month_is_one_path_without_gaps() {
        let nodes = [
            node("2020-07-03 10:00:00", 1.0, 1.0),
            node("2020-07-15 10:00:00", 2.0, 2.0),
            node("2020-07-28 10:00:00", 3.0, 3.0),
        ];
        let segments = build_segments(&nodes, SplitBy::Month);
        assert_eq!(segments.paths.len(), 1);
        assert!(segments.gaps.is_empty());
        assert_eq!(points(&segments.paths[0]).len(), 3);
    }

    #[test]
    fn nodes_are_sorted_by_time() {
        let nodes = [
            node("2020-07-03 12:00:00", 3.0, 3.0),
            node("2020-07-03 10:00:00", 1.0, 1.0),
            node("2020-07-03 11:00:00", 2.0, 2.0),
        ];
        let segments = build_segments(&nodes, SplitBy::Day);
        let lats: Vec<f64> = points(&segments.paths[0]).iter().map(|c| c.lat).collect();
        assert_eq!(lats, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn gap_bridges_last_and_first_fix() {
        let nodes = [
            node("2020-07-01 10:00:00", 1.0, 1.0),
            node("2020-07-01 11:00:00", 2.0, 2.0),
            node("2020-07-02 09:00:00", 3.0, 3.0),
            node("2020-07-02 10:00:00", 4.0, 4.0),
        ];
        let segments = build_segments(&nodes, SplitBy::Day);
        assert_eq!(segments.paths.len(), 2);
        assert_eq!(segments.gaps.len(), 1);
        assert_eq!(
            points(&segments.gaps[0]),
            vec![Coordinate::new(2.0, 2.0), Coordinate::new(3.0, 3.0)]
        );
        assert_eq!(segments.gaps[0].style_url.as_deref(), Some("#pathGap"));
        assert_eq!(segments.paths[0].style_url.as_deref(), Some("#path"));
    }

    #[test]
    fn single_fix_bucket_still_anchors_gaps() {
        let nodes = [
            node("2020-01-10 10:00:00", 1.0, 1.0),
            node("2020-02-10 10:00:00", 2.0, 2.0),
            node("2020-03-10 10:00:00", 3.0, 3.0),
            node("2020-03-11 10:00:00", 4.0, 4.0),
        ];
        let segments = build_segments(&nodes, SplitBy::Month);
        assert_eq!(segments.paths.len(), 1);
        assert_eq!(segments.gaps.len(), 2);
        assert_eq!(
            points(&segments.gaps[1]),
            vec![Coordinate::new(2.0, 2.0), Coordinate::new(3.0, 3.0)]
        );
    }

    #[test]
    fn iso_week_spans_new_year() {
        // 2020-12-31 and 2021-01-01 are both in ISO week 2020-W53
        assert_eq!(bucket_key(SplitBy::Week, &at("2020-12-31 10:00:00")), "202053");
        assert_eq!(bucket_key(SplitBy::Week, &at("2021-01-01 10:00:00")), "202053");
        assert_eq!(bucket_key(SplitBy::Week, &at("2021-01-04 10:00:00")), "202101");
    }

    #[test]
    fn line_name_and_span_use_endpoints() {
        let nodes = [
            node("2020-07-01 10:00:00", 1.0, 1.0),
            node("2020-07-01 12:30:00", 2.0, 2.0),
        ];
        let segments = build_segments(&nodes, SplitBy::None);
        let path = &segments.paths[0];
        assert_eq!(path.name.as_deref(), Some("2020-07-01 10:00 - 2020-07-01 12:30"));
        assert_eq!(
            path.time,
            Some(TimePrimitive::Span {
                begin: at("2020-07-01 10:00:00"),
                end: at("2020-07-01 12:30:00"),
            })
        );
    }

    #[test]
    fn empty_folders_are_omitted() {
        let mut doc = Document::new("root", None);
        let root = doc.root();
        let nodes = [
            node("2020-07-01 10:00:00", 1.0, 1.0),
            node("2020-07-01 11:00:00", 2.0, 2.0),
        ];
        add_path_folders(&mut doc, root, build_segments(&nodes, SplitBy::None));

        assert_eq!(folder_names(&doc, root), vec![PATH_FOLDER]);
        let path = doc.child_folder(root, PATH_FOLDER).unwrap();
        assert_eq!(placemarks(doc.folder(path)).len(), 1);
    }
}
