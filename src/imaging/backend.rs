//! Imaging library boundary.
//!
//! The [`ImagingBackend`] trait is everything the pipeline needs from an
//! imaging library: decode and encode, plus the primitive operations filters
//! are built from (resize, crop, rotate, per-pixel adjustments).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. The geometry and adjustment primitives are infallible: filters
//! validate their params before calling in, so the only failures left are
//! codec failures.

use super::params::{Adjustment, Color, Quality, Region};
use crate::error::ImageError;
use crate::format::Format;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to decode {format}: {message}")]
    Decode { format: Format, message: String },
    #[error("Failed to encode {format}: {message}")]
    Encode { format: Format, message: String },
}

impl From<BackendError> for ImageError {
    fn from(err: BackendError) -> Self {
        ImageError::Format(err.to_string())
    }
}

/// Trait for imaging backends.
///
/// Implementations must be shareable across threads: one backend instance
/// serves every concurrent `make`/`save` call of a handler.
pub trait ImagingBackend: Send + Sync {
    /// Decode `bytes` that are known to be in `format`.
    fn decode(&self, bytes: &[u8], format: Format) -> Result<DynamicImage, BackendError>;

    /// Encode to `format`. `quality` only matters for lossy formats.
    fn encode(
        &self,
        image: &DynamicImage,
        format: Format,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;

    /// Resample to exactly `width` x `height`.
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;

    /// Cut out `region`. The region is already clamped to the image bounds.
    fn crop(&self, image: &DynamicImage, region: Region) -> DynamicImage;

    /// Rotate clockwise by `degrees`. Quarter turns are lossless; other
    /// angles grow the canvas and fill uncovered pixels with `background`.
    fn rotate(&self, image: &DynamicImage, degrees: f32, background: Color) -> DynamicImage;

    /// Apply a cosmetic adjustment.
    fn adjust(&self, image: &DynamicImage, adjustment: Adjustment) -> DynamicImage;
}
