//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`operations`](super::operations) module (which
//! decides what thumbnail to create) and the [`backend`](super::backend)
//! (which does the actual pixel work).
//!
//! - [`Quality`]: JPEG quality (1–100, default 85). Clamped on construction.
//! - [`ThumbnailParams`]: source, output, scaled size, border, quality.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Parameters for a bordered thumbnail.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Size of the scaled photo, excluding the border.
    pub width: u32,
    pub height: u32,
    /// EXIF orientation applied before scaling.
    pub orientation: u32,
    /// Border width in pixels on each side.
    pub border: u32,
    pub border_rgb: [u8; 3],
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_85() {
        assert_eq!(Quality::default().value(), 85);
    }
}
