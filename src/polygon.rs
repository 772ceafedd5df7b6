//! Convex-hull footprints of folder subtrees.
//!
//! The document tree is mirrored into a separate `Polygons` tree with the
//! same folder names and nesting, leaving out the path folders. Every
//! mirrored folder gathers the point coordinates of all photo placemarks
//! beneath it. For each sub-folder with coordinates, the convex hull becomes a
//! polygon placemark hung in the *parent* mirrored folder, right after the
//! sub-folder it summarizes. Points lying directly in the document root get a
//! hull at the polygon root.
//!
//! A hull needs three distinct, non-collinear points; folders that cannot
//! produce one are skipped with a warning.
//!
//! Empty mirrored folders are then removed in one pass. Emptiness is judged
//! on each folder as built, before any of its own children are removed, so a
//! folder that only held empty folders survives (itself now empty).

use crate::kml::{Document, Feature, FolderId, FolderTree, Geometry, Placemark, TreeFeature};
use crate::style::POLYGON_STYLE;
use crate::track::{PATH_FOLDER, PATH_GAP_FOLDER};
use crate::types::Coordinate;
use geo::{Area, ConvexHull, Coord, MultiPoint};

pub const POLYGON_FOLDER: &str = "Polygons";

/// Why no hull was built for a point set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HullSkip {
    TooFewPoints(usize),
    Degenerate,
}

/// Convex hull ring of `points`, counter-clockwise and not closed.
pub fn convex_hull(points: &[Coordinate]) -> Result<Vec<Coordinate>, HullSkip> {
    let mut distinct: Vec<Coordinate> = points.to_vec();
    distinct.sort_by(|a, b| a.lon.total_cmp(&b.lon).then(a.lat.total_cmp(&b.lat)));
    distinct.dedup();
    if distinct.len() < 3 {
        return Err(HullSkip::TooFewPoints(distinct.len()));
    }

    let multi: MultiPoint<f64> = distinct.iter().map(|&c| Coord::from(c)).collect();
    let hull = multi.convex_hull();
    if hull.unsigned_area() == 0.0 {
        return Err(HullSkip::Degenerate);
    }

    let mut ring: Vec<Coordinate> = hull.exterior().coords().map(|&c| c.into()).collect();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    Ok(ring)
}

/// Build the pruned polygon tree for `doc`.
pub fn build_polygons(doc: &Document) -> FolderTree {
    let root = doc.root();
    let mut tree = FolderTree::new(POLYGON_FOLDER);
    let mut direct = Vec::new();

    for feature in &doc.folder(root).features {
        match feature {
            Feature::Folder(id) => {
                let name = doc.folder(*id).name.as_str();
                if [PATH_FOLDER, PATH_GAP_FOLDER, POLYGON_FOLDER].contains(&name) {
                    continue;
                }
                mirror_child(doc, *id, &mut tree);
            }
            Feature::Placemark(p) => direct.extend(p.point()),
        }
    }

    if !direct.is_empty() {
        let name = doc.folder(root).name.clone();
        if let Some(polygon) = hull_placemark(&name, &direct) {
            tree.features.push(TreeFeature::Placemark(polygon));
        }
    }

    prune(tree)
}

/// Mirror `id` into `parent`, followed by its hull polygon.
/// Returns every point coordinate beneath `id`.
fn mirror_child(doc: &Document, id: FolderId, parent: &mut FolderTree) -> Vec<Coordinate> {
    let folder = doc.folder(id);
    let mut mirrored = FolderTree::new(&folder.name);
    let mut coordinates = Vec::new();

    for feature in &folder.features {
        match feature {
            Feature::Folder(child) => {
                coordinates.extend(mirror_child(doc, *child, &mut mirrored));
            }
            Feature::Placemark(p) => coordinates.extend(p.point()),
        }
    }

    parent.features.push(TreeFeature::Folder(mirrored));
    if !coordinates.is_empty() {
        if let Some(polygon) = hull_placemark(&folder.name, &coordinates) {
            parent.features.push(TreeFeature::Placemark(polygon));
        }
    }
    coordinates
}

fn hull_placemark(name: &str, coordinates: &[Coordinate]) -> Option<Placemark> {
    match convex_hull(coordinates) {
        Ok(ring) => {
            let mut placemark = Placemark::new(Geometry::Polygon(ring));
            placemark.name = Some(name.to_string());
            placemark.style_url = Some(format!("#{POLYGON_STYLE}"));
            Some(placemark)
        }
        Err(reason) => {
            tracing::warn!(folder = name, ?reason, "Skipping polygon");
            None
        }
    }
}

/// Drop sub-folders that were empty as built, then recurse into the rest.
fn prune(tree: FolderTree) -> FolderTree {
    let features = tree
        .features
        .into_iter()
        .filter_map(|feature| match feature {
            TreeFeature::Folder(child) if child.is_empty() => None,
            TreeFeature::Folder(child) => Some(TreeFeature::Folder(prune(child))),
            placemark => Some(placemark),
        })
        .collect();
    FolderTree {
        name: tree.name,
        features,
    }
}
