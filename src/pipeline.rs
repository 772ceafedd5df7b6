//! Document assembly.
//!
//! Drives one conversion run from a validated [`Profile`]:
//!
//! 1. Create the document root and the `Images` folder
//! 2. Collect candidate files ([`scan::collect`])
//! 3. Per file: extract metadata, classify into a folder, create the style
//!    triple, write a thumbnail when needed, build the description, attach
//!    the placemark, and record a path fix
//! 4. Add the `Path`/`Path Gap` folders and the `Polygons` tree
//! 5. Render to KML and write the destination file
//!
//! ## Failure model
//!
//! Per-file problems (no EXIF, unusable GPS, unreadable file) are counted in
//! [`Summary::errors`], reported as [`RunEvent`]s, and never stop the batch.
//! Cancellation is checked while walking the source tree and before each
//! file. It ends the run with [`RunOutcome::Aborted`] before anything is
//! serialized, as does a thumbnail directory that cannot be written.
//! Thumbnails already written stay on disk.

use crate::cancel::CancelToken;
use crate::classify::FolderClassifier;
use crate::config::{ConfigError, NameBy, Profile};
use crate::describe::{self, Describer, RefContext, Tokens};
use crate::generate::render_kml;
use crate::imaging::{
    BackendError, DEFAULT_DIMENSIONS, ImageBackend, Limits, ThumbnailStatus, create_thumbnail,
    display_size, get_dimensions, plan_thumbnail,
};
use crate::kml::{Document, Geometry, Placemark, TimePrimitive};
use crate::metadata::{self, MetadataReader, PhotoRecord};
use crate::polygon::build_polygons;
use crate::scan::{self, Collected, ScanError};
use crate::style::{self, DEFAULT_ICON};
use crate::track::{self, LineNode};
use crate::types::{Coordinate, format_date};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const IMAGES_FOLDER: &str = "Images";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Running counters of a conversion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    /// Files processed.
    pub files: usize,
    /// Files with EXIF data.
    pub exif: usize,
    /// Files with a real GPS fix.
    pub gps: usize,
    pub placemarks: usize,
    /// Files skipped because of an error.
    pub errors: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    Cancelled,
    ThumbnailDirUnwritable(PathBuf),
}

#[derive(Debug)]
pub struct RunReport {
    pub summary: Summary,
    pub dest: PathBuf,
    pub document: Document,
    /// The KML text written to `dest`.
    pub kml: String,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    Aborted {
        reason: AbortReason,
        summary: Summary,
    },
}

/// What happened to one photo.
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoStatus {
    /// Placed in the named folder.
    Placed { folder: String },
    /// No usable location and null coordinates are excluded.
    NotLocated,
    Failed(String),
}

/// Progress events sent while a run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Collected {
        count: usize,
    },
    Photo {
        index: usize,
        total: usize,
        path: PathBuf,
        status: PhotoStatus,
    },
    /// Thumbnail or dimension problem; the photo is still placed.
    Warning {
        path: PathBuf,
        message: String,
    },
    Written {
        path: PathBuf,
    },
}

/// Everything one run accumulates besides the document.
struct RunState {
    summary: Summary,
    nodes: Vec<LineNode>,
    started: Instant,
}

impl RunState {
    fn summary(&self) -> Summary {
        Summary {
            elapsed: self.started.elapsed(),
            ..self.summary.clone()
        }
    }

    fn abort(&self, reason: AbortReason) -> RunOutcome {
        tracing::info!(?reason, "Run aborted");
        RunOutcome::Aborted {
            reason,
            summary: self.summary(),
        }
    }
}

fn emit(events: &Option<Sender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Run the conversion described by `profile`.
pub fn run(
    profile: &Profile,
    reader: &impl MetadataReader,
    backend: &impl ImageBackend,
    cancel: &CancelToken,
    events: Option<Sender<RunEvent>>,
) -> Result<RunOutcome, PipelineError> {
    let mut state = RunState {
        summary: Summary::default(),
        nodes: Vec::new(),
        started: Instant::now(),
    };
    profile.validate()?;

    let source_dir = absolute(&profile.source.dir);
    let source_root = if source_dir.is_file() {
        source_dir.parent().unwrap_or(&source_dir).to_path_buf()
    } else {
        source_dir.clone()
    };
    let dest = absolute(&profile.dest);
    let source = crate::config::SourceConfig {
        dir: source_dir,
        ..profile.source.clone()
    };

    let root_description = Some(profile.folder.root_description.as_str())
        .filter(|d| !d.is_empty())
        .map(describe::cdata_wrap);
    let mut doc = Document::new(&profile.folder.root_name, root_description);
    let root = doc.root();
    let images = doc.add_folder(root, IMAGES_FOLDER);
    if profile.path.draw || profile.path.draw_polygon {
        for track_style in style::track_styles(&profile.path) {
            doc.add_style(track_style);
        }
    }

    let files = match scan::collect(&source, cancel)? {
        Collected::Complete(files) => files,
        Collected::Interrupted(_) => return Ok(state.abort(AbortReason::Cancelled)),
    };
    tracing::info!(count = files.len(), source = %source_root.display(), "Collected files");
    emit(&events, RunEvent::Collected { count: files.len() });

    let thumbnail_dir = if profile.needs_thumbnails() {
        let dir = dest
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(describe::thumbnail_dir_name(&dest));
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(path = %dir.display(), error = %e, "Thumbnail directory not writable");
            return Ok(state.abort(AbortReason::ThumbnailDirUnwritable(dir)));
        }
        Some(dir)
    } else {
        None
    };

    let mut classifier = FolderClassifier::new(&profile.folder, &source_root, images)
        .map_err(|e| ConfigError::Validation(format!("folder.regex: {e}")))?;
    let mut describer = Describer::new(&profile.description, &source_root);
    let refs = RefContext {
        source_root: &source_root,
        dest: &dest,
    };
    let limits = Limits::from_config(&profile.photo);
    let default = Coordinate::new(profile.source.default_lat, profile.source.default_lon);
    let total = files.len();
    let mut styled = HashSet::new();

    for (index, path) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            return Ok(state.abort(AbortReason::Cancelled));
        }
        state.summary.files += 1;
        let photo_event = |status| RunEvent::Photo {
            index: index + 1,
            total,
            path: path.clone(),
            status,
        };

        let record = match metadata::extract(reader, path, default) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping photo");
                state.summary.errors += 1;
                emit(&events, photo_event(PhotoStatus::Failed(e.to_string())));
                continue;
            }
        };
        state.summary.exif += 1;
        if record.has_location() {
            state.summary.gps += 1;
        } else if !profile.source.include_null_coordinate {
            tracing::debug!(path = %path.display(), "No location");
            emit(&events, photo_event(PhotoStatus::NotLocated));
            continue;
        }

        let crc = match style::file_checksum(path) {
            Ok(crc) => crc,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable photo");
                state.summary.errors += 1;
                emit(&events, photo_event(PhotoStatus::Failed(e.to_string())));
                continue;
            }
        };

        let dims = match record.dimensions {
            Some(dims) => dims,
            None => get_dimensions(backend, path).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Using default dimensions");
                emit(
                    &events,
                    RunEvent::Warning {
                        path: path.clone(),
                        message: format!("using default dimensions: {e}"),
                    },
                );
                DEFAULT_DIMENSIONS
            }),
        };

        if let Some(dir) = &thumbnail_dir {
            let output = dir.join(describe::thumbnail_file_name(crc));
            let params = plan_thumbnail(
                path,
                &output,
                dims,
                record.orientation,
                limits,
                &profile.thumbnail,
            );
            match create_thumbnail(backend, &params) {
                Ok(ThumbnailStatus::Created) => {
                    tracing::debug!(path = %output.display(), "Thumbnail created");
                }
                Ok(ThumbnailStatus::Existing) => {}
                Err(BackendError::Io(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                    return Ok(state.abort(AbortReason::ThumbnailDirUnwritable(dir.clone())));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Thumbnail failed");
                    emit(
                        &events,
                        RunEvent::Warning {
                            path: path.clone(),
                            message: format!("thumbnail failed: {e}"),
                        },
                    );
                }
            }
        }

        let href = describe::photo_href(&profile.photo, &refs, path, crc);
        let icon = if profile.placemark.symbol_as_photo {
            format!(
                "{}/{}",
                describe::thumbnail_dir_name(&dest),
                describe::thumbnail_file_name(crc)
            )
        } else {
            DEFAULT_ICON.to_string()
        };
        // identical files share one style set
        if styled.insert(crc) {
            for photo_style in style::photo_styles(crc, &profile.placemark, &icon) {
                doc.add_style(photo_style);
            }
        }

        let tokens = Tokens {
            record: &record,
            href: &href,
            size: display_size(dims, record.is_rotated(), limits),
        };
        let mut placemark = Placemark::new(Geometry::Point(record.coordinate));
        placemark.name = placemark_name(profile, &record);
        placemark.description = describer.describe(&tokens);
        placemark.time = profile
            .placemark
            .timestamp
            .then_some(TimePrimitive::Stamp(record.date));
        placemark.style_url = Some(style::photo_style_url(crc));

        let folder = classifier.classify(&mut doc, path, &record.date);
        doc.add_placemark(folder, placemark);
        state.summary.placemarks += 1;

        if record.has_location() {
            state.nodes.push(LineNode {
                time: record.date,
                coordinate: record.coordinate,
            });
        }
        tracing::debug!(path = %path.display(), folder = %doc.folder(folder).name, "Placed photo");
        emit(
            &events,
            photo_event(PhotoStatus::Placed {
                folder: doc.folder(folder).name.clone(),
            }),
        );
    }

    if profile.path.draw {
        let segments = track::build_segments(&state.nodes, profile.path.split_by);
        track::add_path_folders(&mut doc, root, segments);
    }
    if profile.path.draw_polygon {
        let polygons = build_polygons(&doc);
        if !polygons.is_empty() {
            doc.graft(root, polygons);
        }
    }

    let kml = render_kml(&doc);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|source| PipelineError::Write {
            path: dest.clone(),
            source,
        })?;
    }
    std::fs::write(&dest, &kml).map_err(|source| PipelineError::Write {
        path: dest.clone(),
        source,
    })?;
    tracing::info!(path = %dest.display(), placemarks = state.summary.placemarks, "KML written");
    emit(&events, RunEvent::Written { path: dest.clone() });

    Ok(RunOutcome::Completed(RunReport {
        summary: state.summary(),
        dest,
        document: doc,
        kml,
    }))
}

fn placemark_name(profile: &Profile, record: &PhotoRecord) -> Option<String> {
    match profile.placemark.name_by {
        NameBy::None => None,
        NameBy::File => record
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
        NameBy::Date => format_date(&record.date, &profile.placemark.date_pattern).ok(),
    }
}
