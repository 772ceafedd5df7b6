//! Thumbnail generation.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Thumbnail** | upright + `resize_exact` + border + JPEG encode |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    DEFAULT_DIMENSIONS, DEFAULT_THUMBNAIL_LIMIT, Limits, bordered_size, display_size, fit_within,
};
pub use operations::{ThumbnailStatus, create_thumbnail, get_dimensions, plan_thumbnail};
pub use params::{Quality, ThumbnailParams};
pub use rust_backend::RustBackend;
