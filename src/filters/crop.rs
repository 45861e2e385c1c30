use super::params::parse;
use super::{Filter, FilterStage};
use crate::error::{ImageError, Result};
use crate::imaging::calculations::clamp_region;
use crate::imaging::{ImagingBackend, Region};
use crate::raster::Image;
use serde::Deserialize;
use serde_json::Value;

pub(super) const NAME: &str = "crop";

/// Cut a rectangle out of the image. The rectangle is clamped to the image
/// bounds; one that lies entirely outside is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crop;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CropParams {
    #[serde(default)]
    x: u32,
    #[serde(default)]
    y: u32,
    width: u32,
    height: u32,
}

impl Filter for Crop {
    fn stage(&self) -> FilterStage {
        FilterStage::Geometry
    }

    fn apply(&self, backend: &dyn ImagingBackend, image: Image, params: &Value) -> Result<Image> {
        let p: CropParams = parse(NAME, params)?;
        let requested = Region {
            x: p.x,
            y: p.y,
            width: p.width,
            height: p.height,
        };
        let region = clamp_region(requested, image.dimensions()).ok_or_else(|| {
            let (w, h) = image.dimensions();
            ImageError::invalid_params(
                NAME,
                format!(
                    "region {}x{}+{}+{} is empty within a {w}x{h} image",
                    p.width, p.height, p.x, p.y
                ),
            )
        })?;

        let (width, height) = image.dimensions();
        let full_frame = Region {
            x: 0,
            y: 0,
            width,
            height,
        };
        if region == full_frame {
            return Ok(image);
        }
        Ok(image.map_pixels(|pixels| backend.crop(&pixels, region)))
    }
}
