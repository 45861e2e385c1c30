//! Shared test utilities for the imgflow test suite.
//!
//! Provides synthetic encoded fixtures, an in-memory [`Source`] and a
//! temporary public root pre-populated with the usual test images.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let root = setup_public_root();
//! let handler = local_handler(root.path());
//! let image = handler.open("image.jpg").unwrap();
//! assert_eq!(image.dimensions(), (300, 300));
//! ```

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

use crate::error::{ImageError, Result};
use crate::filters::default_registry;
use crate::handler::ImageHandler;
use crate::source::{LocalSource, Source};

// =========================================================================
// Synthetic images
// =========================================================================

/// RGB image where every pixel is distinct, so crops and rotations can be
/// checked by sampling.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let w = width.max(1);
    let h = height.max(1);
    let buffer = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / w) as u8,
            (y * 255 / h) as u8,
            ((x + y) % 256) as u8,
        ])
    });
    DynamicImage::ImageRgb8(buffer)
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient_image(width, height), ImageFormat::Jpeg)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient_image(width, height), ImageFormat::Png)
}

// =========================================================================
// Sources
// =========================================================================

/// Source backed by a `HashMap`, rooted at the virtual `/memory` directory.
#[derive(Default)]
pub struct MemorySource {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, bytes: Vec<u8>) -> Self {
        self.files.lock().unwrap().insert(path.to_string(), bytes);
        self
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }
}

impl Source for MemorySource {
    fn driver(&self) -> &str {
        "memory"
    }

    fn locate(&self, path: &str) -> Result<PathBuf> {
        Ok(Path::new("/memory").join(path))
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.files.lock().unwrap().contains_key(path))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.get(path)
            .ok_or_else(|| ImageError::FileMissing(Path::new("/memory").join(path)))
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }
}

// =========================================================================
// Fixture setup
// =========================================================================

/// Temp directory holding `image.jpg` (300x300), `image.png` (120x80) and
/// `wrong.jpg`, a text file with an image extension.
pub fn setup_public_root() -> TempDir {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("image.jpg"), jpeg_bytes(300, 300)).unwrap();
    std::fs::write(tmp.path().join("image.png"), png_bytes(120, 80)).unwrap();
    std::fs::write(tmp.path().join("wrong.jpg"), b"plain text, not a jpeg").unwrap();
    tmp
}

/// Handler with the default filters and a local source bound to `root`.
pub fn local_handler(root: &Path) -> ImageHandler {
    let mut handler = ImageHandler::new(default_registry());
    handler.set_source(Arc::new(LocalSource::new(root)));
    handler
}
