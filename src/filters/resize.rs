use super::params::parse;
use super::{Filter, FilterStage};
use crate::error::{ImageError, Result};
use crate::imaging::calculations::plan_resize;
use crate::imaging::{ImagingBackend, ResizePlan};
use crate::raster::Image;
use serde::Deserialize;
use serde_json::Value;

pub(super) const NAME: &str = "resize";

/// Scale to a width, a height, or into a box.
///
/// With one side the other follows the aspect ratio. With both sides the
/// image fits inside the box, unless `crop` is set: then it covers the box
/// and is center-cropped to exactly `width` x `height`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResizeParams {
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    crop: bool,
}

/// Largest side a resize may produce.
pub const MAX_DIMENSION: u32 = 16_384;

/// Largest pixel count a resize may produce, fill buffers included.
pub const MAX_PIXELS: u64 = 64 * 1024 * 1024;

fn side(value: Option<u32>, key: &str) -> Result<Option<u32>> {
    match value {
        Some(0) => Err(ImageError::invalid_params(
            NAME,
            format!("{key} must be greater than zero"),
        )),
        Some(n) if n > MAX_DIMENSION => Err(ImageError::invalid_params(
            NAME,
            format!("{key} {n} exceeds {MAX_DIMENSION}"),
        )),
        other => Ok(other),
    }
}

/// Reject planned buffers that are too large to allocate.
fn within_limits((width, height): (u32, u32)) -> Result<()> {
    let pixels = u64::from(width) * u64::from(height);
    if width > MAX_DIMENSION || height > MAX_DIMENSION || pixels > MAX_PIXELS {
        return Err(ImageError::invalid_params(
            NAME,
            format!("{width}x{height} is larger than {MAX_DIMENSION}px a side or {MAX_PIXELS} pixels"),
        ));
    }
    Ok(())
}

impl Filter for Resize {
    fn stage(&self) -> FilterStage {
        FilterStage::Geometry
    }

    fn apply(&self, backend: &dyn ImagingBackend, image: Image, params: &Value) -> Result<Image> {
        let params: ResizeParams = parse(NAME, params)?;
        let width = side(params.width, "width")?;
        let height = side(params.height, "height")?;

        let plan = plan_resize(image.dimensions(), width, height, params.crop);
        match plan {
            ResizePlan::Identity => {}
            ResizePlan::Exact { width, height } => within_limits((width, height))?,
            ResizePlan::Fill { fill, .. } => within_limits(fill)?,
        }
        Ok(match plan {
            ResizePlan::Identity => image,
            ResizePlan::Exact { width, height } => {
                image.map_pixels(|pixels| backend.resize(&pixels, width, height))
            }
            ResizePlan::Fill { fill, crop } => image.map_pixels(|pixels| {
                let filled = backend.resize(&pixels, fill.0, fill.1);
                backend.crop(&filled, crop)
            }),
        })
    }
}
