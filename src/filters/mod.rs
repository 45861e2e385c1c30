//! Filters and the name → filter registry.
//!
//! A [`Filter`] is a named image transformation. It receives the image by
//! value together with its params (a `serde_json::Value` taken straight from
//! the chain configuration), validates the params itself and returns the new
//! image. The pixel work is delegated to the [`ImagingBackend`] it is handed,
//! which keeps filters testable against the mock backend.
//!
//! ## Built-in filters
//!
//! | Name | Stage | Params |
//! |---|---|---|
//! | `resize` | geometry | `{width?, height?, crop = false}` |
//! | `crop` | geometry | `{x = 0, y = 0, width, height}` |
//! | `rotate` | orientation | `90`, or `{angle, background = "#ffffff"}` |
//! | `grayscale` | cosmetic | `true` |
//! | `negative` | cosmetic | `true` |
//! | `blur` | cosmetic | `2.0`, or `{sigma}` |
//! | `gamma` | cosmetic | `1.8`, or `{correction}` |
//! | `colorize` | cosmetic | `"#ff0000"`, or `{color}` |
//!
//! ## Registry
//!
//! [`FilterRegistry`] is a plain map with no interior locking: mutation needs
//! `&mut self`. Handlers share it as `Arc<FilterRegistry>` and register new
//! filters through `Arc::make_mut`, so a `make` call that already holds the
//! old `Arc` keeps working against its snapshot.

mod color;
mod crop;
mod params;
mod resize;
mod rotate;

pub use color::{Blur, Colorize, Gamma, Grayscale, Negative};
pub use crop::Crop;
pub use resize::Resize;
pub use rotate::Rotate;

use crate::error::{ImageError, Result};
use crate::imaging::ImagingBackend;
use crate::raster::Image;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Coarse ordering class used when a shorthand config is normalized.
///
/// Shorthand steps run in stage order: everything that changes the frame
/// first, then orientation, then per-pixel work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterStage {
    Geometry,
    Orientation,
    Cosmetic,
}

pub trait Filter: Send + Sync {
    fn stage(&self) -> FilterStage {
        FilterStage::Cosmetic
    }

    /// Transform `image` according to `params`.
    ///
    /// Invalid params fail with [`ImageError::InvalidParams`].
    fn apply(&self, backend: &dyn ImagingBackend, image: Image, params: &Value) -> Result<Image>;
}

#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Arc<dyn Filter>>,
}

impl FilterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in filter.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(resize::NAME, Resize);
        registry.register(crop::NAME, Crop);
        registry.register(rotate::NAME, Rotate);
        registry.register(color::GRAYSCALE, Grayscale);
        registry.register(color::NEGATIVE, Negative);
        registry.register(color::BLUR, Blur);
        registry.register(color::GAMMA, Gamma);
        registry.register(color::COLORIZE, Colorize);
        registry
    }

    /// Bind `name` to `filter`. Registering an existing name replaces it.
    pub fn register(&mut self, name: impl Into<String>, filter: impl Filter + 'static) {
        self.register_arc(name, Arc::new(filter));
    }

    pub fn register_arc(&mut self, name: impl Into<String>, filter: Arc<dyn Filter>) {
        self.filters.insert(name.into(), filter);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Filter>> {
        self.filters
            .get(name)
            .cloned()
            .ok_or_else(|| ImageError::FilterMissing(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

static DEFAULT_REGISTRY: LazyLock<Arc<FilterRegistry>> =
    LazyLock::new(|| Arc::new(FilterRegistry::with_defaults()));

/// Process-wide registry with the built-in filters.
pub fn default_registry() -> Arc<FilterRegistry> {
    Arc::clone(&DEFAULT_REGISTRY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use image::DynamicImage;
    use serde_json::json;

    struct Fixed(u32);

    impl Filter for Fixed {
        fn apply(&self, _: &dyn ImagingBackend, _: Image, _: &Value) -> Result<Image> {
            Ok(Image::new(DynamicImage::new_rgb8(self.0, self.0)))
        }
    }

    #[test]
    fn defaults_cover_builtin_names() {
        let registry = FilterRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec![
                "blur",
                "colorize",
                "crop",
                "gamma",
                "grayscale",
                "negative",
                "resize",
                "rotate"
            ]
        );
    }

    #[test]
    fn get_unknown_is_filter_missing() {
        let registry = FilterRegistry::with_defaults();
        let err = registry.get("wrong").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::FilterMissing);
        assert_eq!(err.to_string(), "Filter not found: wrong");
    }

    #[test]
    fn register_twice_last_wins() {
        let backend = crate::imaging::backend::tests::MockBackend::new();
        let mut registry = FilterRegistry::new();
        registry.register("fixed", Fixed(10));
        registry.register("fixed", Fixed(20));
        assert_eq!(registry.len(), 1);

        let image = Image::new(DynamicImage::new_rgb8(1, 1));
        let out = registry
            .get("fixed")
            .unwrap()
            .apply(&backend, image, &json!(true))
            .unwrap();
        assert_eq!(out.dimensions(), (20, 20));
    }

    #[test]
    fn stages_order_geometry_first() {
        let registry = FilterRegistry::with_defaults();
        let stage = |name: &str| registry.get(name).unwrap().stage();
        assert_eq!(stage("resize"), FilterStage::Geometry);
        assert_eq!(stage("crop"), FilterStage::Geometry);
        assert_eq!(stage("rotate"), FilterStage::Orientation);
        assert_eq!(stage("blur"), FilterStage::Cosmetic);
        assert!(FilterStage::Geometry < FilterStage::Orientation);
        assert!(FilterStage::Orientation < FilterStage::Cosmetic);
    }

    #[test]
    fn default_registry_is_shared() {
        assert!(Arc::ptr_eq(&default_registry(), &default_registry()));
        assert!(default_registry().has("resize"));
    }

    #[test]
    fn make_mut_copies_shared_registry() {
        let shared = Arc::new(FilterRegistry::with_defaults());
        let snapshot = Arc::clone(&shared);
        let mut mine = shared;
        Arc::make_mut(&mut mine).register("fixed", Fixed(1));

        assert!(mine.has("fixed"));
        assert!(!snapshot.has("fixed"));
    }
}
