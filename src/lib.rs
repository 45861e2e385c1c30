//! # imgflow
//!
//! An image manipulation pipeline: locate an image through a named storage
//! source, decode it, run it through an ordered chain of filters, and save or
//! stream the result.
//!
//! # Architecture
//!
//! ```text
//! ImageHandler::make(path, config)
//!   ├─ Source::read(path)            bytes from the bound source
//!   ├─ detect_format + sniff         extension decides, content must agree
//!   ├─ ImagingBackend::decode        image crate codecs
//!   ├─ chain::normalize(config)      explicit list or shorthand → steps
//!   └─ chain::execute(steps)         Filter::apply, one step at a time
//! ImageHandler::save(image, path)
//!   ├─ ImagingBackend::encode        format from the target extension
//!   └─ Source::write                 temp file + rename
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`handler`] | [`ImageHandler`]: `set_source`, `open`, `format`, `make`, `save` |
//! | [`source`] | [`Source`] trait, [`SourceRegistry`], the local filesystem driver |
//! | [`format`] | [`Format`] tags, extension detection, content sniffing |
//! | [`raster`] | [`Image`]: pixels plus origin [`Metadata`] |
//! | [`imaging`] | [`ImagingBackend`] trait and the pure-Rust backend |
//! | [`filters`] | [`Filter`] trait, [`FilterRegistry`], built-in filters |
//! | [`chain`] | Filter chain config shapes, normalization and execution |
//! | [`url`] | Filter chains encoded in file names |
//! | [`batch`] | Parallel make + save with progress events |
//! | [`config`] | `imgflow.toml` loading, merging and validation |
//! | [`logging`] | `tracing-subscriber` setup for the CLI |
//! | [`output`] | CLI output formatting |
//! | [`error`] | [`ImageError`] and its kinds |
//!
//! # Quick start
//!
//! ```no_run
//! use imgflow::{FilterChainConfig, ImageHandler, LocalSource, default_registry};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut handler = ImageHandler::new(default_registry());
//! handler.set_source(Arc::new(LocalSource::new("public")));
//!
//! let config = FilterChainConfig::from_value(json!({
//!     "width": 100, "height": 90, "crop": true, "rotate": 90
//! }))?;
//! let image = handler.make("image.jpg", &config)?;
//! handler.save(&image, "image-small.png")?;
//! # Ok::<(), imgflow::ImageError>(())
//! ```

pub mod batch;
pub mod chain;
pub mod config;
pub mod error;
pub mod filters;
pub mod format;
pub mod handler;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod raster;
pub mod source;
pub mod url;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use chain::{FilterChainConfig, FilterStep, Presets};
pub use error::{ErrorKind, ImageError, Result};
pub use filters::{Filter, FilterRegistry, FilterStage, default_registry};
pub use format::{Format, detect_format};
pub use handler::ImageHandler;
pub use imaging::{ImagingBackend, RustBackend};
pub use raster::{Image, Metadata};
pub use source::{LocalSource, Source, SourceRegistry};
