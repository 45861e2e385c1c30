//! Imaging library boundary: pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode** | `image` codecs (JPEG, PNG, GIF, WebP) |
//! | **Resize** | Lanczos3 resampling |
//! | **Rotate** | quarter turns in `image`, other angles via `imageproc` |
//! | **Adjust** | grayscale, negate, blur, gamma, colorize |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImagingBackend`] trait + [`RustBackend`]

pub mod backend;
pub mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImagingBackend};
pub use calculations::ResizePlan;
pub use params::{Adjustment, Color, ColorParseError, Quality, Region};
pub use rust_backend::RustBackend;
