//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Upright | `image::metadata::Orientation` + `DynamicImage::apply_orientation` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Border | `image::imageops::overlay` onto a solid canvas |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder::new_with_quality` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::bordered_size;
use super::params::ThumbnailParams;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Surround `img` with a solid border.
fn add_border(img: &DynamicImage, border: u32, rgb: [u8; 3]) -> RgbImage {
    let (width, height) = bordered_size((img.width(), img.height()), border);
    let mut canvas = RgbImage::from_pixel(width, height, Rgb(rgb));
    image::imageops::overlay(&mut canvas, &img.to_rgb8(), border as i64, border as i64);
    canvas
}

/// `thumb.jpg` is staged as `thumb.jpg.part`.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Encode next to `path` and rename into place, so `path` only ever holds
/// a complete JPEG.
fn save_jpeg(img: RgbImage, path: &Path, quality: u8) -> Result<(), BackendError> {
    let partial = partial_path(path);
    let result = write_jpeg(img, &partial, quality)
        .and_then(|()| std::fs::rename(&partial, path).map_err(BackendError::Io));
    if result.is_err() {
        std::fs::remove_file(&partial).ok();
    }
    result
}

fn write_jpeg(img: RgbImage, path: &Path, quality: u8) -> Result<(), BackendError> {
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let mut writer = std::io::BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    DynamicImage::ImageRgb8(img)
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
    writer.flush().map_err(BackendError::Io)
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let mut img = load_image(&params.source)?;

        if let Some(orientation) = u8::try_from(params.orientation)
            .ok()
            .and_then(Orientation::from_exif)
        {
            img.apply_orientation(orientation);
        }

        let scaled = img.resize_exact(params.width, params.height, FilterType::Lanczos3);
        let bordered = add_border(&scaled, params.border, params.border_rgb);
        save_jpeg(bordered, &params.output, params.quality.value())
    }
}
