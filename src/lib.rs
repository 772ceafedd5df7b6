//! # Mapollage
//!
//! Turns a directory of geotagged photos into a KML document for map viewers.
//! Each located photo becomes a placemark with an HTML balloon showing the
//! photo; placemarks are grouped into folders, optionally joined by a travel
//! path, and summarized by convex-hull polygons.
//!
//! # Architecture: One Pass Over the Photos
//!
//! ```text
//! 1. Collect   source/         →  sorted file list       (include glob, exclude substrings)
//! 2. Extract   each file       →  PhotoRecord            (EXIF date, GPS, orientation)
//! 3. Place     PhotoRecord     →  placemark in a folder  (dir / date / regex key)
//! 4. Derive    located photos  →  Path, Path Gap, Polygons
//! 5. Render    Document        →  dest.kml               (maud)
//! ```
//!
//! Steps 2 and 3 run per file inside [`pipeline::run`]; per-file failures are
//! counted and skipped. Thumbnails are written next to the KML file when the
//! placemarks reference them.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | TOML profile: stock defaults, user overlay, validation |
//! | [`scan`] | File collection with glob include and substring exclude |
//! | [`metadata`] | EXIF extraction into [`metadata::PhotoRecord`] |
//! | [`classify`] | Folder keys and on-demand folder creation |
//! | [`kml`] | In-memory KML document: folders, placemarks, styles |
//! | [`style`] | Checksum-derived per-photo styles and the shared track styles |
//! | [`describe`] | Photo references and balloon description templates |
//! | [`track`] | Time-bucketed travel path and gap lines |
//! | [`polygon`] | Convex-hull footprints mirroring the folder tree |
//! | [`imaging`] | Dimension probing and bordered JPEG thumbnails |
//! | [`generate`] | KML serialization with Maud |
//! | [`pipeline`] | Run orchestration, counters, cancellation |
//! | [`output`] | CLI progress and summary formatting |
//! | [`types`] | Shared value types |
//!
//! # Design Decisions
//!
//! ## Arena Document
//!
//! Folders live in one arena inside [`kml::Document`] and are addressed by
//! [`kml::FolderId`]. The classifier keeps ids of folders it has created, so
//! a photo deep in a hierarchy is attached without walking the tree. The
//! polygon tree is built as a separate owned [`kml::FolderTree`] and grafted
//! in at the end.
//!
//! ## Stable Style Ids
//!
//! Per-photo style ids derive from the CRC32 of the photo's bytes, so running
//! twice over the same photos produces the same KML.
//!
//! ## Maud for KML
//!
//! The document is rendered with the same [Maud](https://maud.lambda.xyz/)
//! macros used for HTML. Element names are written in KML's own casing.

pub mod cancel;
pub mod classify;
pub mod config;
pub mod describe;
pub mod generate;
pub mod imaging;
pub mod kml;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod polygon;
pub mod scan;
pub mod style;
pub mod track;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
