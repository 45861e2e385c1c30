//! Pure Rust imaging backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image::load_from_memory_with_format` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → PNG, GIF, WebP | `DynamicImage::write_to` (lossless) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Quarter-turn rotation | `rotate90` / `rotate180` / `rotate270` |
//! | Arbitrary rotation | `imageproc::geometric_transformations::rotate_about_center` on an expanded canvas |
//! | Grayscale, negate, blur | `DynamicImage::grayscale` / `invert` / `blur` |
//! | Gamma, colorize | per-pixel on RGBA8 |

use super::backend::{BackendError, ImagingBackend};
use super::calculations::{center_offset, quarter_turns, rotated_bounds};
use super::params::{Adjustment, Color, Quality, Region};
use crate::format::Format;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy)]
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

/// JPEG has no alpha channel; everything but 8-bit luma goes through RGB8.
fn jpeg_compatible(image: &DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image.clone(),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

/// The WebP encoder only accepts 8-bit RGB/RGBA.
fn webp_compatible(image: &DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image.clone(),
        _ if image.color().has_alpha() => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

fn rotate_arbitrary(image: &DynamicImage, degrees: f32, background: Color) -> DynamicImage {
    let source = image.to_rgba8();
    let bg = background.to_rgba();
    let bounds = rotated_bounds((source.width(), source.height()), degrees);

    // Pad onto the final canvas first so rotation about the center does not clip.
    let mut canvas = RgbaImage::from_pixel(bounds.0, bounds.1, bg);
    let (x, y) = center_offset(bounds, (source.width(), source.height()));
    image::imageops::overlay(&mut canvas, &source, x as i64, y as i64);

    let rotated = rotate_about_center(
        &canvas,
        degrees.to_radians(),
        Interpolation::Bilinear,
        bg,
    );
    DynamicImage::ImageRgba8(rotated)
}

fn map_rgb(image: &DynamicImage, f: impl Fn(u8, usize) -> u8) -> DynamicImage {
    let mut rgba = image.to_rgba8();
    for pixel in rgba.pixels_mut() {
        for (i, channel) in pixel.0.iter_mut().take(3).enumerate() {
            *channel = f(*channel, i);
        }
    }
    DynamicImage::ImageRgba8(rgba)
}

fn gamma_table(correction: f32) -> [u8; 256] {
    let exponent = 1.0 / correction as f64;
    let mut table = [0u8; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let v = (i as f64 / 255.0).powf(exponent) * 255.0;
        *slot = v.round().clamp(0.0, 255.0) as u8;
    }
    table
}

impl ImagingBackend for RustBackend {
    fn decode(&self, bytes: &[u8], format: Format) -> Result<DynamicImage, BackendError> {
        image::load_from_memory_with_format(bytes, format.image_format()).map_err(|e| {
            BackendError::Decode {
                format,
                message: e.to_string(),
            }
        })
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: Format,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let mut buf = Cursor::new(Vec::new());
        let result = match format {
            Format::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
                jpeg_compatible(image).write_with_encoder(encoder)
            }
            Format::WebP => webp_compatible(image).write_to(&mut buf, format.image_format()),
            Format::Gif => DynamicImage::ImageRgba8(image.to_rgba8())
                .write_to(&mut buf, format.image_format()),
            Format::Png => image.write_to(&mut buf, format.image_format()),
        };
        result.map_err(|e| BackendError::Encode {
            format,
            message: e.to_string(),
        })?;
        Ok(buf.into_inner())
    }

    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        image.resize_exact(width, height, FilterType::Lanczos3)
    }

    fn crop(&self, image: &DynamicImage, region: Region) -> DynamicImage {
        image.crop_imm(region.x, region.y, region.width, region.height)
    }

    fn rotate(&self, image: &DynamicImage, degrees: f32, background: Color) -> DynamicImage {
        match quarter_turns(degrees) {
            Some(0) => image.clone(),
            Some(1) => image.rotate90(),
            Some(2) => image.rotate180(),
            Some(_) => image.rotate270(),
            None => rotate_arbitrary(image, degrees, background),
        }
    }

    fn adjust(&self, image: &DynamicImage, adjustment: Adjustment) -> DynamicImage {
        match adjustment {
            Adjustment::Grayscale => image.grayscale(),
            Adjustment::Negate => {
                let mut inverted = image.clone();
                inverted.invert();
                inverted
            }
            Adjustment::Blur(sigma) => image.blur(sigma),
            Adjustment::Gamma(correction) => {
                let table = gamma_table(correction);
                map_rgb(image, |v, _| table[v as usize])
            }
            Adjustment::Colorize(color) => {
                let offsets = [color.r, color.g, color.b];
                map_rgb(image, |v, i| v.saturating_add(offsets[i]))
            }
        }
    }
}
