//! Cosmetic filters: per-pixel work that keeps the geometry.

use super::params::{enabled, parse_shape, positive};
use super::Filter;
use crate::error::{ImageError, Result};
use crate::imaging::{Adjustment, Color, ImagingBackend};
use crate::raster::Image;
use serde::Deserialize;
use serde_json::Value;

pub(super) const GRAYSCALE: &str = "grayscale";
pub(super) const NEGATIVE: &str = "negative";
pub(super) const BLUR: &str = "blur";
pub(super) const GAMMA: &str = "gamma";
pub(super) const COLORIZE: &str = "colorize";

/// Sigma used when `blur` is switched on without a value.
const DEFAULT_SIGMA: f32 = 1.0;

fn adjust(backend: &dyn ImagingBackend, image: Image, adjustment: Adjustment) -> Image {
    image.map_pixels(|pixels| backend.adjust(&pixels, adjustment))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Grayscale;

impl Filter for Grayscale {
    fn apply(&self, backend: &dyn ImagingBackend, image: Image, params: &Value) -> Result<Image> {
        if !enabled(GRAYSCALE, params)? {
            return Ok(image);
        }
        Ok(adjust(backend, image, Adjustment::Grayscale))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Negative;

impl Filter for Negative {
    fn apply(&self, backend: &dyn ImagingBackend, image: Image, params: &Value) -> Result<Image> {
        if !enabled(NEGATIVE, params)? {
            return Ok(image);
        }
        Ok(adjust(backend, image, Adjustment::Negate))
    }
}

/// Gaussian blur: `2.0`, `{sigma}`, or `true` for a sigma of 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blur;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BlurParams {
    Switch(bool),
    Sigma(f32),
    Options { sigma: f32 },
}

impl Filter for Blur {
    fn apply(&self, backend: &dyn ImagingBackend, image: Image, params: &Value) -> Result<Image> {
        let sigma = match parse_shape(BLUR, params, "a sigma or {sigma}")? {
            BlurParams::Switch(false) => return Ok(image),
            BlurParams::Switch(true) => DEFAULT_SIGMA,
            BlurParams::Sigma(sigma) | BlurParams::Options { sigma } => sigma,
        };
        let sigma = positive(BLUR, "sigma", sigma)?;
        Ok(adjust(backend, image, Adjustment::Blur(sigma)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Gamma;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GammaParams {
    Correction(f32),
    Options { correction: f32 },
}

impl Filter for Gamma {
    fn apply(&self, backend: &dyn ImagingBackend, image: Image, params: &Value) -> Result<Image> {
        let correction = match parse_shape(GAMMA, params, "a correction or {correction}")? {
            GammaParams::Correction(c) | GammaParams::Options { correction: c } => c,
        };
        let correction = positive(GAMMA, "correction", correction)?;
        Ok(adjust(backend, image, Adjustment::Gamma(correction)))
    }
}

/// Shift every pixel towards a color: `"#ff0000"` or `{color}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Colorize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColorizeParams {
    Hex(String),
    Options { color: String },
}

impl Filter for Colorize {
    fn apply(&self, backend: &dyn ImagingBackend, image: Image, params: &Value) -> Result<Image> {
        let hex = match parse_shape(COLORIZE, params, "a hex color or {color}")? {
            ColorizeParams::Hex(hex) | ColorizeParams::Options { color: hex } => hex,
        };
        let color = hex
            .parse::<Color>()
            .map_err(|e| ImageError::invalid_params(COLORIZE, e.to_string()))?;
        Ok(adjust(backend, image, Adjustment::Colorize(color)))
    }
}
