//! In-memory KML document tree.
//!
//! Folders live in an arena owned by the [`Document`] and are addressed by
//! [`FolderId`]. Components never hold references into the tree; they append
//! through the document with the id of the parent they were handed, which
//! keeps lookups identity-stable (the same id always names the same folder)
//! without shared ownership.
//!
//! Owned [`FolderTree`]s are used for structures built on the side, such as
//! the polygon mirror, and are grafted in with [`Document::graft`].

use crate::types::Coordinate;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FolderId(usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    pub name: String,
    pub description: Option<String>,
    pub open: bool,
    pub features: Vec<Feature>,
}

impl Folder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            open: false,
            features: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Folder(FolderId),
    Placemark(Placemark),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimePrimitive {
    Stamp(NaiveDateTime),
    Span {
        begin: NaiveDateTime,
        end: NaiveDateTime,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coordinate),
    LineString(Vec<Coordinate>),
    /// Outer boundary; the ring is closed on serialization.
    Polygon(Vec<Coordinate>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placemark {
    pub name: Option<String>,
    /// Already CDATA-wrapped where needed.
    pub description: Option<String>,
    pub geometry: Geometry,
    pub time: Option<TimePrimitive>,
    /// `#id` of a style or style map.
    pub style_url: Option<String>,
}

impl Placemark {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            name: None,
            description: None,
            geometry,
            time: None,
            style_url: None,
        }
    }

    pub fn point(&self) -> Option<Coordinate> {
        match self.geometry {
            Geometry::Point(c) => Some(c),
            _ => None,
        }
    }
}

// =============================================================================
// Styles
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct IconStyle {
    pub scale: f64,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolyStyle {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    pub id: String,
    pub icon: Option<IconStyle>,
    /// BalloonStyle text.
    pub balloon: Option<String>,
    pub line: Option<LineStyle>,
    pub poly: Option<PolyStyle>,
}

/// Pairs a normal and a highlight style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleMap {
    pub id: String,
    pub normal: String,
    pub highlight: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StyleSelector {
    Style(Style),
    StyleMap(StyleMap),
}

impl StyleSelector {
    pub fn id(&self) -> &str {
        match self {
            StyleSelector::Style(s) => &s.id,
            StyleSelector::StyleMap(m) => &m.id,
        }
    }
}

// =============================================================================
// Owned side trees
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FolderTree {
    pub name: String,
    pub features: Vec<TreeFeature>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeFeature {
    Folder(FolderTree),
    Placemark(Placemark),
}

impl FolderTree {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            features: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

// =============================================================================
// Document
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    folders: Vec<Folder>,
    pub styles: Vec<StyleSelector>,
}

impl Document {
    /// A document whose root folder is rendered as the KML `<Document>`.
    pub fn new(name: &str, description: Option<String>) -> Self {
        let mut root = Folder::new(name);
        root.description = description;
        root.open = true;
        Self {
            folders: vec![root],
            styles: Vec::new(),
        }
    }

    pub fn root(&self) -> FolderId {
        FolderId(0)
    }

    pub fn folder(&self, id: FolderId) -> &Folder {
        &self.folders[id.0]
    }

    /// Append a new, empty sub-folder to `parent`.
    pub fn add_folder(&mut self, parent: FolderId, name: &str) -> FolderId {
        let id = FolderId(self.folders.len());
        self.folders.push(Folder::new(name));
        self.folders[parent.0].features.push(Feature::Folder(id));
        id
    }

    /// First direct sub-folder of `parent` named `name`.
    pub fn child_folder(&self, parent: FolderId, name: &str) -> Option<FolderId> {
        self.folder(parent).features.iter().find_map(|f| match f {
            Feature::Folder(id) if self.folder(*id).name == name => Some(*id),
            _ => None,
        })
    }

    /// Ids of the direct sub-folders of `parent`, in order.
    pub fn child_folders(&self, parent: FolderId) -> Vec<FolderId> {
        self.folder(parent)
            .features
            .iter()
            .filter_map(|f| match f {
                Feature::Folder(id) => Some(*id),
                Feature::Placemark(_) => None,
            })
            .collect()
    }

    pub fn add_placemark(&mut self, parent: FolderId, placemark: Placemark) {
        self.folders[parent.0]
            .features
            .push(Feature::Placemark(placemark));
    }

    pub fn add_style(&mut self, style: StyleSelector) {
        self.styles.push(style);
    }

    pub fn has_style(&self, id: &str) -> bool {
        self.styles.iter().any(|s| s.id() == id)
    }

    /// Insert an owned tree as a new sub-folder of `parent`.
    pub fn graft(&mut self, parent: FolderId, tree: FolderTree) -> FolderId {
        let id = self.add_folder(parent, &tree.name);
        for feature in tree.features {
            match feature {
                TreeFeature::Folder(child) => {
                    self.graft(id, child);
                }
                TreeFeature::Placemark(p) => self.add_placemark(id, p),
            }
        }
        id
    }

    /// Count placemarks in the subtree rooted at `id`.
    pub fn placemark_count(&self, id: FolderId) -> usize {
        self.folder(id)
            .features
            .iter()
            .map(|f| match f {
                Feature::Folder(child) => self.placemark_count(*child),
                Feature::Placemark(_) => 1,
            })
            .sum()
    }
}
