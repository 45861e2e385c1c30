//! The decoded image value threaded through the pipeline.
//!
//! An [`Image`] owns its pixel buffer and its [`Metadata`]. Filters take an
//! `Image` by value and hand back a new one; [`Image::map_pixels`] swaps the
//! buffer while carrying the metadata over, so origin information
//! (`filepath`, `format`) survives the whole chain.

use crate::format::Format;
use image::{DynamicImage, GenericImageView};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Origin and format information attached to an [`Image`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Physical location the image was decoded from.
    pub filepath: Option<PathBuf>,
    /// Format the image was decoded from.
    pub format: Option<Format>,
    /// Free-form entries (e.g. the logical path the caller asked for).
    pub extra: BTreeMap<String, String>,
}

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra.insert(key.into(), value.into());
    }
}

#[derive(Debug, Clone)]
pub struct Image {
    pixels: DynamicImage,
    metadata: Metadata,
}

impl Image {
    pub fn new(pixels: DynamicImage) -> Self {
        Self {
            pixels,
            metadata: Metadata::default(),
        }
    }

    pub fn with_metadata(pixels: DynamicImage, metadata: Metadata) -> Self {
        Self { pixels, metadata }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> DynamicImage {
        self.pixels
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn filepath(&self) -> Option<&Path> {
        self.metadata.filepath.as_deref()
    }

    /// Replace the pixel buffer, keeping the metadata.
    pub fn map_pixels(self, f: impl FnOnce(DynamicImage) -> DynamicImage) -> Self {
        Self {
            pixels: f(self.pixels),
            metadata: self.metadata,
        }
    }

    /// Same as [`map_pixels`](Self::map_pixels) for fallible transforms.
    pub fn try_map_pixels<E>(
        self,
        f: impl FnOnce(DynamicImage) -> Result<DynamicImage, E>,
    ) -> Result<Self, E> {
        Ok(Self {
            pixels: f(self.pixels)?,
            metadata: self.metadata,
        })
    }
}

impl From<DynamicImage> for Image {
    fn from(pixels: DynamicImage) -> Self {
        Self::new(pixels)
    }
}
