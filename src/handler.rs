//! The image handler: one entry point for open, filter and save.
//!
//! ```text
//! set_source ──► open(path) ──► apply_filters(config) ──► save(path)
//!                  │                                       │
//!            Source::read                            Source::write
//!          detect + sniff format                     encode (quality)
//!             backend decode
//! ```
//!
//! [`ImageHandler::make`] is `open` followed by `apply_filters`. Every stage
//! either succeeds or aborts the call with the error it raised; no partially
//! filtered image is ever returned.
//!
//! All operations take `&self` and the handler is `Send + Sync`, so one
//! handler can serve any number of threads. Only binding a source and
//! registering filters need `&mut self`.

use crate::chain::{self, FilterChainConfig, Presets};
use crate::config::Config;
use crate::error::{ImageError, Result};
use crate::filters::{Filter, FilterRegistry, default_registry};
use crate::format::{Format, detect_format, verify_content};
use crate::imaging::{ImagingBackend, Quality, RustBackend};
use crate::raster::{Image, Metadata};
use crate::source::{Source, SourceRegistry};
use std::fmt;
use std::sync::Arc;

/// Driver name reported when no source is bound.
const NO_SOURCE: &str = "none";

/// Metadata key holding the logical path an image was opened from.
pub const PATH_KEY: &str = "path";

#[derive(Clone)]
pub struct ImageHandler {
    source: Option<Arc<dyn Source>>,
    filters: Arc<FilterRegistry>,
    backend: Arc<dyn ImagingBackend>,
    presets: Arc<Presets>,
    quality: Quality,
}

impl fmt::Debug for ImageHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandler")
            .field("source", &self.source.as_ref().map(|s| s.driver().to_string()))
            .field("filters", &self.filters.names())
            .field("presets", &self.presets.keys().collect::<Vec<_>>())
            .field("quality", &self.quality)
            .finish()
    }
}

impl ImageHandler {
    /// Handler using the pure-Rust backend and no bound source.
    pub fn new(filters: Arc<FilterRegistry>) -> Self {
        Self::with_backend(filters, Arc::new(RustBackend::new()))
    }

    pub fn with_backend(filters: Arc<FilterRegistry>, backend: Arc<dyn ImagingBackend>) -> Self {
        Self {
            source: None,
            filters,
            backend,
            presets: Arc::new(Presets::new()),
            quality: Quality::default(),
        }
    }

    pub fn with_presets(mut self, presets: Presets) -> Self {
        self.presets = Arc::new(presets);
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Handler with the default filters, the configured presets and quality,
    /// bound to the configured default source.
    pub fn from_config(config: &Config, sources: &SourceRegistry) -> Result<Self> {
        let mut handler = Self::new(default_registry())
            .with_presets(config.presets.clone())
            .with_quality(Quality::new(config.output.quality));
        handler.set_source(sources.resolve(&config.default_source)?);
        Ok(handler)
    }

    /// Bind the source subsequent `open`/`make`/`save` calls use. The last
    /// call wins.
    pub fn set_source(&mut self, source: Arc<dyn Source>) {
        self.source = Some(source);
    }

    pub fn source(&self) -> Option<&Arc<dyn Source>> {
        self.source.as_ref()
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn presets(&self) -> &Presets {
        &self.presets
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Add or replace a filter for this handler only. A registry shared with
    /// other handlers is copied first.
    pub fn register_filter(&mut self, name: impl Into<String>, filter: impl Filter + 'static) {
        Arc::make_mut(&mut self.filters).register(name, filter);
    }

    fn bound_source(&self) -> Result<&Arc<dyn Source>> {
        self.source
            .as_ref()
            .ok_or_else(|| ImageError::DriverMissing(NO_SOURCE.to_string()))
    }

    /// Read and decode `path` from the bound source.
    ///
    /// The extension decides the format and the content must agree with it.
    /// The returned image carries the physical location as
    /// [`Metadata::filepath`].
    pub fn open(&self, path: &str) -> Result<Image> {
        let source = self.bound_source()?;
        let bytes = source.read(path)?;
        let format = verify_content(path, &bytes)?;
        let pixels = self.backend.decode(&bytes, format)?;

        let mut metadata = Metadata {
            filepath: Some(source.locate(path)?),
            format: Some(format),
            ..Metadata::default()
        };
        metadata.insert(PATH_KEY, path);

        let image = Image::with_metadata(pixels, metadata);
        tracing::debug!(
            path,
            format = %format,
            width = image.width(),
            height = image.height(),
            "opened image"
        );
        Ok(image)
    }

    /// Format implied by the extension of `path`. Does no I/O.
    pub fn format(&self, path: &str) -> Result<Format> {
        detect_format(path)
    }

    /// Open `path` and run it through the filter chain.
    pub fn make(&self, path: &str, config: &FilterChainConfig) -> Result<Image> {
        let image = self.open(path)?;
        self.apply_filters(image, config)
    }

    /// [`make`](Self::make) with no filters.
    pub fn make_default(&self, path: &str) -> Result<Image> {
        self.make(path, &FilterChainConfig::empty())
    }

    pub fn apply_filters(&self, image: Image, config: &FilterChainConfig) -> Result<Image> {
        chain::apply_chain(
            image,
            config,
            &self.filters,
            &self.presets,
            self.backend.as_ref(),
        )
    }

    /// Encode without writing anywhere, for streaming the bytes elsewhere.
    pub fn encode(&self, image: &Image, format: Format) -> Result<Vec<u8>> {
        Ok(self.backend.encode(image.pixels(), format, self.quality)?)
    }

    /// Encode `image` in the format named by the extension of `path` and write
    /// it to the bound source, replacing any existing file.
    pub fn save(&self, image: &Image, path: &str) -> Result<()> {
        let format = detect_format(path)?;
        let source = self.bound_source()?;
        let bytes = self.encode(image, format)?;
        source.write(path, &bytes)?;
        tracing::debug!(path, format = %format, size_bytes = bytes.len(), "saved image");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::{MemorySource, jpeg_bytes, local_handler, png_bytes, setup_public_root};
    use image::DynamicImage;
    use crate::filters::FilterStage;
    use serde_json::json;
    use std::sync::Mutex;

    fn shorthand(value: serde_json::Value) -> FilterChainConfig {
        FilterChainConfig::from_value(value).unwrap()
    }

    fn mock_handler(backend: Arc<MockBackend>) -> ImageHandler {
        let mut handler = ImageHandler::with_backend(default_registry(), backend);
        handler.set_source(Arc::new(
            MemorySource::new()
                .with_file("image.jpg", jpeg_bytes(4, 4))
                .with_file("image.png", png_bytes(4, 4)),
        ));
        handler
    }

    #[test]
    fn handler_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ImageHandler>();
    }

    #[test]
    fn set_source_last_wins() {
        let mut handler = ImageHandler::new(default_registry());
        assert!(handler.source().is_none());

        let first: Arc<dyn Source> = Arc::new(MemorySource::new());
        let second: Arc<dyn Source> = Arc::new(MemorySource::new());
        handler.set_source(first.clone());
        handler.set_source(second.clone());
        assert!(Arc::ptr_eq(handler.source().unwrap(), &second));
    }

    #[test]
    fn open_without_source_is_driver_missing() {
        let handler = ImageHandler::new(default_registry());
        let err = handler.open("image.jpg").unwrap_err();
        assert!(matches!(err, ImageError::DriverMissing(ref d) if d == "none"));
    }

    #[test]
    fn open_sets_metadata() {
        let root = setup_public_root();
        let handler = local_handler(root.path());
        let image = handler.open("image.jpg").unwrap();

        assert_eq!(image.dimensions(), (300, 300));
        assert_eq!(image.filepath(), Some(root.path().join("image.jpg").as_path()));
        assert_eq!(image.metadata().format, Some(Format::Jpeg));
        assert_eq!(image.metadata().get(PATH_KEY), Some("image.jpg"));
    }

    #[test]
    fn open_missing_is_file_missing() {
        let root = setup_public_root();
        let handler = local_handler(root.path());
        let err = handler.open("doesnt-exists.jpg").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileMissing);
    }

    #[test]
    fn open_non_image_is_format_error() {
        let root = setup_public_root();
        let handler = local_handler(root.path());
        assert_eq!(
            handler.open("wrong.jpg").unwrap_err().kind(),
            ErrorKind::Format
        );
    }

    #[test]
    fn open_mismatched_content_is_format_error() {
        let backend = Arc::new(MockBackend::new());
        let mut handler = mock_handler(backend.clone());
        handler.set_source(Arc::new(
            MemorySource::new().with_file("disguised.jpg", png_bytes(4, 4)),
        ));
        let err = handler.open("disguised.jpg").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(backend.get_operations().is_empty(), "must not decode");
    }

    #[test]
    fn format_is_extension_only() {
        let handler = ImageHandler::new(default_registry());
        assert_eq!(handler.format("image.jpg").unwrap(), Format::Jpeg);
        assert_eq!(handler.format("never/opened.png").unwrap(), Format::Png);
        assert_eq!(handler.format("notes.txt").unwrap_err().kind(), ErrorKind::Format);
    }

    #[test]
    fn make_resizes_then_rotates() {
        let backend = Arc::new(MockBackend::new());
        let handler = mock_handler(backend.clone());
        let image = handler
            .make(
                "image.jpg",
                &shorthand(json!({"rotate": 90, "width": 100, "height": 90, "crop": true})),
            )
            .unwrap();

        assert_eq!(image.dimensions(), (90, 100));
        let ops = backend.get_operations();
        assert_eq!(ops.first(), Some(&RecordedOp::Decode(Format::Jpeg)));
        assert_eq!(ops.last(), Some(&RecordedOp::Rotate(90.0)));
    }

    #[test]
    fn make_with_unknown_filter_is_filter_missing() {
        let backend = Arc::new(MockBackend::new());
        let handler = mock_handler(backend);
        let err = handler
            .make("image.jpg", &shorthand(json!({"wrong": true})))
            .unwrap_err();
        assert!(matches!(err, ImageError::FilterMissing(ref n) if n == "wrong"));
    }

    #[test]
    fn make_default_is_identity() {
        let root = setup_public_root();
        let handler = local_handler(root.path());
        let opened = handler.open("image.png").unwrap();
        let made = handler.make_default("image.png").unwrap();
        assert_eq!(made.dimensions(), opened.dimensions());
        assert_eq!(made.pixels().as_bytes(), opened.pixels().as_bytes());
    }

    #[test]
    fn presets_come_from_the_handler() {
        let backend = Arc::new(MockBackend::new());
        let mut presets = Presets::new();
        let serde_json::Value::Object(small) = json!({"width": 30}) else {
            unreachable!()
        };
        presets.insert("small".into(), small);
        let handler = mock_handler(backend).with_presets(presets);

        let image = handler
            .make("image.jpg", &shorthand(json!({"small": true})))
            .unwrap();
        assert_eq!(image.width(), 30);
    }

    #[test]
    fn register_filter_is_copy_on_write() {
        struct Tiny;
        impl Filter for Tiny {
            fn apply(
                &self,
                _: &dyn ImagingBackend,
                image: Image,
                _: &serde_json::Value,
            ) -> Result<Image> {
                Ok(image.map_pixels(|_| DynamicImage::new_rgb8(1, 1)))
            }
        }

        let shared = default_registry();
        let mut handler = ImageHandler::new(shared.clone());
        handler.register_filter("tiny", Tiny);

        assert!(handler.filters().has("tiny"));
        assert!(!shared.has("tiny"));
        assert!(!default_registry().has("tiny"));
    }

    #[test]
    fn shorthand_keys_call_registered_filters() {
        type Calls = Arc<Mutex<Vec<(String, serde_json::Value)>>>;

        struct Recording {
            name: &'static str,
            stage: FilterStage,
            calls: Calls,
        }
        impl Filter for Recording {
            fn stage(&self) -> FilterStage {
                self.stage
            }
            fn apply(
                &self,
                _: &dyn ImagingBackend,
                image: Image,
                params: &serde_json::Value,
            ) -> Result<Image> {
                self.calls
                    .lock()
                    .unwrap()
                    .push((self.name.to_string(), params.clone()));
                Ok(image)
            }
        }

        let calls: Calls = Arc::default();
        let backend = Arc::new(MockBackend::new());
        let mut handler = mock_handler(backend.clone());
        handler.register_filter(
            "resize",
            Recording {
                name: "resize",
                stage: FilterStage::Geometry,
                calls: calls.clone(),
            },
        );
        handler.register_filter(
            "rotate",
            Recording {
                name: "rotate",
                stage: FilterStage::Orientation,
                calls: calls.clone(),
            },
        );

        handler
            .make(
                "image.jpg",
                &shorthand(json!({"rotate": 90, "width": 100, "height": 90, "crop": true})),
            )
            .unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                (
                    "resize".to_string(),
                    json!({"width": 100, "height": 90, "crop": true})
                ),
                ("rotate".to_string(), json!({"angle": 90})),
            ]
        );
        // The built-in resize and rotate never ran.
        assert_eq!(backend.get_operations(), vec![RecordedOp::Decode(Format::Jpeg)]);
    }

    #[test]
    fn save_uses_quality_and_extension() {
        let backend = Arc::new(MockBackend::new());
        let source = Arc::new(MemorySource::new());
        let mut handler = ImageHandler::with_backend(default_registry(), backend.clone())
            .with_quality(Quality::new(70));
        handler.set_source(source.clone());

        let image = Image::new(DynamicImage::new_rgb8(12, 8));
        handler.save(&image, "out/thumb.webp").unwrap();

        assert_eq!(source.get("out/thumb.webp"), Some(b"12x8".to_vec()));
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Encode {
                format: Format::WebP,
                quality: 70
            }]
        );
    }

    #[test]
    fn save_with_unknown_extension_writes_nothing() {
        let backend = Arc::new(MockBackend::new());
        let source = Arc::new(MemorySource::new());
        let mut handler = ImageHandler::with_backend(default_registry(), backend.clone());
        handler.set_source(source.clone());

        let image = Image::new(DynamicImage::new_rgb8(2, 2));
        let err = handler.save(&image, "out.bmp").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(source.get("out.bmp").is_none());
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn save_then_open_roundtrip() {
        let root = setup_public_root();
        let handler = local_handler(root.path());
        let image = handler
            .make("image.jpg", &shorthand(json!({"width": 100, "height": 90, "crop": true})))
            .unwrap();
        handler.save(&image, "cache/image-100x90.png").unwrap();

        let reopened = handler.open("cache/image-100x90.png").unwrap();
        assert_eq!(reopened.dimensions(), (100, 90));
        assert_eq!(reopened.metadata().format, Some(Format::Png));
    }
}
