//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{Limits, display_size};
use super::params::{Quality, ThumbnailParams};
use crate::config::ThumbnailSettings;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Whether [`create_thumbnail`] did any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailStatus {
    Created,
    /// The output already existed and was left alone.
    Existing,
}

/// Plan a thumbnail operation without executing it.
///
/// `dims` are the stored pixel dimensions. The photo is turned upright and
/// scaled into `limits` (or the default box when no limit is enabled).
pub fn plan_thumbnail(
    source: &Path,
    output: &Path,
    dims: (u32, u32),
    orientation: u32,
    limits: Limits,
    settings: &ThumbnailSettings,
) -> ThumbnailParams {
    let rotated = (5..=8).contains(&orientation);
    let (width, height) = display_size(dims, rotated, limits.or_default());

    ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width,
        height,
        orientation,
        border: settings.border,
        border_rgb: settings.border_rgb(),
        quality: Quality::new(settings.quality),
    }
}

/// Create a thumbnail unless `params.output` already exists.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    params: &ThumbnailParams,
) -> Result<ThumbnailStatus> {
    if params.output.exists() {
        return Ok(ThumbnailStatus::Existing);
    }
    backend.thumbnail(params)?;
    Ok(ThumbnailStatus::Created)
}
