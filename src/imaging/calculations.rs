//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::config::PhotoRefConfig;

/// Longest side used for thumbnails when no limit is enabled.
pub const DEFAULT_THUMBNAIL_LIMIT: u32 = 500;

/// Substituted when a photo's dimensions cannot be read.
pub const DEFAULT_DIMENSIONS: (u32, u32) = (640, 480);

/// Optional bounding box a photo is scaled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limits {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Limits {
    /// The enabled limits of a photo reference configuration.
    pub fn from_config(config: &PhotoRefConfig) -> Self {
        Self {
            width: config.limit_width.then_some(config.width_limit),
            height: config.limit_height.then_some(config.height_limit),
        }
    }

    /// Fall back to a square [`DEFAULT_THUMBNAIL_LIMIT`] box when unbounded.
    pub fn or_default(self) -> Self {
        if self.width.is_none() && self.height.is_none() {
            Self {
                width: Some(DEFAULT_THUMBNAIL_LIMIT),
                height: Some(DEFAULT_THUMBNAIL_LIMIT),
            }
        } else {
            self
        }
    }
}

/// Scale `source` down to fit within `limits`, preserving the aspect ratio.
///
/// Images already inside the box are returned unchanged; never upscales.
///
/// # Examples
/// ```
/// # use mapollage::imaging::{fit_within, Limits};
/// let limits = Limits { width: Some(400), height: None };
/// assert_eq!(fit_within((800, 600), limits), (400, 300));
/// ```
pub fn fit_within(source: (u32, u32), limits: Limits) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return source;
    }

    let width_ratio = limits.width.map_or(1.0, |w| w as f64 / src_w as f64);
    let height_ratio = limits.height.map_or(1.0, |h| h as f64 / src_h as f64);
    let ratio = width_ratio.min(height_ratio).min(1.0);

    let w = ((src_w as f64 * ratio).round() as u32).max(1);
    let h = ((src_h as f64 * ratio).round() as u32).max(1);
    (w, h)
}

/// Displayed size of a photo whose stored pixels may be rotated a quarter turn.
///
/// EXIF dimensions describe the stored pixels; a rotated photo is displayed
/// with width and height swapped.
pub fn display_size(source: (u32, u32), rotated: bool, limits: Limits) -> (u32, u32) {
    let upright = if rotated {
        (source.1, source.0)
    } else {
        source
    };
    fit_within(upright, limits)
}

/// Canvas size after adding a border of `border` pixels on each side.
pub fn bordered_size(inner: (u32, u32), border: u32) -> (u32, u32) {
    (inner.0 + 2 * border, inner.1 + 2 * border)
}
