use super::params::parse_shape;
use super::{Filter, FilterStage};
use crate::error::{ImageError, Result};
use crate::imaging::calculations::quarter_turns;
use crate::imaging::{Color, ImagingBackend};
use crate::raster::Image;
use serde::Deserialize;
use serde_json::Value;

pub(super) const NAME: &str = "rotate";

/// Rotate clockwise by an angle in degrees.
///
/// Takes a bare angle (`90`) or `{angle, background}`. Uncovered corners of
/// non-quarter rotations are filled with `background` (white by default).
#[derive(Debug, Clone, Copy, Default)]
pub struct Rotate;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RotateParams {
    Angle(f32),
    Options {
        angle: f32,
        background: Option<String>,
    },
}

impl Filter for Rotate {
    fn stage(&self) -> FilterStage {
        FilterStage::Orientation
    }

    fn apply(&self, backend: &dyn ImagingBackend, image: Image, params: &Value) -> Result<Image> {
        let params: RotateParams =
            parse_shape(NAME, params, "an angle in degrees or {angle, background}")?;
        let (angle, background) = match params {
            RotateParams::Angle(angle) => (angle, Color::WHITE),
            RotateParams::Options { angle, background } => {
                let background = match background {
                    Some(hex) => hex
                        .parse::<Color>()
                        .map_err(|e| ImageError::invalid_params(NAME, e.to_string()))?,
                    None => Color::WHITE,
                };
                (angle, background)
            }
        };

        if !angle.is_finite() {
            return Err(ImageError::invalid_params(
                NAME,
                format!("angle must be a finite number of degrees, got {angle}"),
            ));
        }

        if quarter_turns(angle) == Some(0) {
            return Ok(image);
        }
        Ok(image.map_pixels(|pixels| backend.rotate(&pixels, angle, background)))
    }
}
