//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Region;

/// What a resize request amounts to for a given source size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePlan {
    /// Nothing to do (no target side given).
    Identity,
    /// Resample to exactly these dimensions.
    Exact { width: u32, height: u32 },
    /// Resample to `fill`, then cut `crop` out of it.
    Fill { fill: (u32, u32), crop: Region },
}

/// Decide how to resize `source` for the requested sides.
///
/// - one side given: the other follows the source aspect ratio
/// - both sides, no crop: fit inside the box, keeping the ratio
/// - both sides, crop: cover the box, then center-crop to it exactly
pub fn plan_resize(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
    crop: bool,
) -> ResizePlan {
    let (w, h) = match (width, height) {
        (None, None) => return ResizePlan::Identity,
        (Some(w), None) => scale_to_width(source, w),
        (None, Some(h)) => scale_to_height(source, h),
        (Some(w), Some(h)) if crop => {
            let fill = calculate_fill_dimensions(source, (w, h));
            let (x, y) = center_offset(fill, (w, h));
            return ResizePlan::Fill {
                fill,
                crop: Region {
                    x,
                    y,
                    width: w,
                    height: h,
                },
            };
        }
        (Some(w), Some(h)) => fit_within(source, (w, h)),
    };
    ResizePlan::Exact {
        width: w,
        height: h,
    }
}

/// Scale to the given width, keeping the aspect ratio.
pub fn scale_to_width(source: (u32, u32), width: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    let h = (width as f64 * src_h as f64 / src_w as f64).round() as u32;
    (width, h.max(1))
}

/// Scale to the given height, keeping the aspect ratio.
pub fn scale_to_height(source: (u32, u32), height: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    let w = (height as f64 * src_w as f64 / src_h as f64).round() as u32;
    (w.max(1), height)
}

/// Largest size with the source aspect ratio that fits inside `bounds`.
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    let src_aspect = src_w as f64 / src_h as f64;
    let box_aspect = max_w as f64 / max_h as f64;

    if src_aspect > box_aspect {
        scale_to_width(source, max_w)
    } else {
        scale_to_height(source, max_h)
    }
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w.max(tgt_w), h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h.max(tgt_h))
    }
}

/// Top-left offset that centers `inner` within `outer`.
pub fn center_offset(outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
    (
        outer.0.saturating_sub(inner.0) / 2,
        outer.1.saturating_sub(inner.1) / 2,
    )
}

/// Intersect `region` with an image of `dims`. `None` when nothing is left.
pub fn clamp_region(region: Region, dims: (u32, u32)) -> Option<Region> {
    let (w, h) = dims;
    if region.x >= w || region.y >= h {
        return None;
    }
    let width = region.width.min(w - region.x);
    let height = region.height.min(h - region.y);
    if width == 0 || height == 0 {
        return None;
    }
    Some(Region {
        x: region.x,
        y: region.y,
        width,
        height,
    })
}

/// Normalize an angle in degrees to `[0, 360)`.
pub fn normalize_degrees(degrees: f32) -> f32 {
    degrees.rem_euclid(360.0)
}

/// If `degrees` is a multiple of 90, the number of quarter turns (0..=3).
pub fn quarter_turns(degrees: f32) -> Option<u8> {
    let normalized = normalize_degrees(degrees);
    let turns = (normalized / 90.0).round();
    if (normalized - turns * 90.0).abs() < 1e-4 {
        Some((turns as u32 % 4) as u8)
    } else {
        None
    }
}

/// Bounding box of `dims` rotated by `degrees`.
pub fn rotated_bounds(dims: (u32, u32), degrees: f32) -> (u32, u32) {
    if let Some(turns) = quarter_turns(degrees) {
        return if turns % 2 == 0 { dims } else { (dims.1, dims.0) };
    }
    let theta = (degrees as f64).to_radians();
    let (w, h) = (dims.0 as f64, dims.1 as f64);
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let bw = (w * cos + h * sin).ceil() as u32;
    let bh = (w * sin + h * cos).ceil() as u32;
    (bw.max(1), bh.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // plan_resize tests
    // =========================================================================

    #[test]
    fn plan_without_sides_is_identity() {
        assert_eq!(plan_resize((300, 300), None, None, true), ResizePlan::Identity);
    }

    #[test]
    fn plan_width_only_keeps_ratio() {
        assert_eq!(
            plan_resize((400, 300), Some(200), None, false),
            ResizePlan::Exact {
                width: 200,
                height: 150
            }
        );
    }

    #[test]
    fn plan_height_only_keeps_ratio() {
        assert_eq!(
            plan_resize((400, 300), None, Some(150), true),
            ResizePlan::Exact {
                width: 200,
                height: 150
            }
        );
    }

    #[test]
    fn plan_box_without_crop_fits_inside() {
        // 300x300 into 100x90 → limited by height
        assert_eq!(
            plan_resize((300, 300), Some(100), Some(90), false),
            ResizePlan::Exact {
                width: 90,
                height: 90
            }
        );
        // 400x200 into 100x90 → limited by width
        assert_eq!(
            plan_resize((400, 200), Some(100), Some(90), false),
            ResizePlan::Exact {
                width: 100,
                height: 50
            }
        );
    }

    #[test]
    fn plan_box_with_crop_fills_then_centers() {
        // 300x300 → cover 100x90 → 100x100, crop 100x90 at y=5
        assert_eq!(
            plan_resize((300, 300), Some(100), Some(90), true),
            ResizePlan::Fill {
                fill: (100, 100),
                crop: Region {
                    x: 0,
                    y: 5,
                    width: 100,
                    height: 90
                }
            }
        );
    }

    // =========================================================================
    // calculate_fill_dimensions tests
    // =========================================================================

    #[test]
    fn fill_wider_source_to_portrait_target() {
        // 800x600 (4:3) → 400x500 target
        // Source is wider, so height matches: 500, width = 500 * (4/3) = 667
        assert_eq!(calculate_fill_dimensions((800, 600), (400, 500)), (667, 500));
    }

    #[test]
    fn fill_taller_source_to_landscape_target() {
        assert_eq!(calculate_fill_dimensions((600, 800), (500, 400)), (500, 667));
    }

    #[test]
    fn fill_same_aspect_ratio() {
        assert_eq!(calculate_fill_dimensions((800, 600), (400, 300)), (400, 300));
    }

    #[test]
    fn fill_never_smaller_than_target() {
        let (w, h) = calculate_fill_dimensions((1000, 333), (100, 33));
        assert!(w >= 100 && h >= 33);
    }

    // =========================================================================
    // region and rotation tests
    // =========================================================================

    #[test]
    fn clamp_region_trims_overflow() {
        let region = Region {
            x: 50,
            y: 50,
            width: 100,
            height: 100,
        };
        assert_eq!(
            clamp_region(region, (120, 80)),
            Some(Region {
                x: 50,
                y: 50,
                width: 70,
                height: 30
            })
        );
    }

    #[test]
    fn clamp_region_outside_is_none() {
        let region = Region {
            x: 200,
            y: 0,
            width: 10,
            height: 10,
        };
        assert_eq!(clamp_region(region, (100, 100)), None);
    }

    #[test]
    fn quarter_turns_detects_multiples() {
        assert_eq!(quarter_turns(0.0), Some(0));
        assert_eq!(quarter_turns(90.0), Some(1));
        assert_eq!(quarter_turns(-90.0), Some(3));
        assert_eq!(quarter_turns(450.0), Some(1));
        assert_eq!(quarter_turns(45.0), None);
    }

    #[test]
    fn rotated_bounds_swaps_on_quarter_turn() {
        assert_eq!(rotated_bounds((100, 90), 90.0), (90, 100));
        assert_eq!(rotated_bounds((100, 90), 180.0), (100, 90));
    }

    #[test]
    fn rotated_bounds_expands_on_diagonal() {
        // 100x100 at 45° → diagonal ≈ 141.42
        assert_eq!(rotated_bounds((100, 100), 45.0), (142, 142));
    }
}
