//! Image encoding formats and format detection.
//!
//! The primary signal is the file extension, mapped through a fixed table.
//! Content sniffing (magic bytes) is used when the bytes are available, to
//! reject files whose content contradicts what the extension claims.
//!
//! | Extension | Format |
//! |---|---|
//! | `jpg`, `jpeg` | [`Format::Jpeg`] |
//! | `png` | [`Format::Png`] |
//! | `gif` | [`Format::Gif`] |
//! | `webp` | [`Format::WebP`] |

use crate::error::{ImageError, Result};
use image::ImageFormat;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const EXTENSIONS: &[(&str, Format)] = &[
    ("jpg", Format::Jpeg),
    ("jpeg", Format::Jpeg),
    ("png", Format::Png),
    ("gif", Format::Gif),
    ("webp", Format::WebP),
];

/// On-disk image encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Jpeg => "jpeg",
            Format::Png => "png",
            Format::Gif => "gif",
            Format::WebP => "webp",
        }
    }

    /// Canonical file extension for output names.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Jpeg => "jpg",
            Format::Png => "png",
            Format::Gif => "gif",
            Format::WebP => "webp",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Format::Jpeg => ImageFormat::Jpeg,
            Format::Png => ImageFormat::Png,
            Format::Gif => ImageFormat::Gif,
            Format::WebP => ImageFormat::WebP,
        }
    }

    fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Format::Jpeg),
            ImageFormat::Png => Some(Format::Png),
            ImageFormat::Gif => Some(Format::Gif),
            ImageFormat::WebP => Some(Format::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        EXTENSIONS
            .iter()
            .find(|(ext, _)| *ext == lower)
            .map(|(_, format)| *format)
            .ok_or_else(|| ImageError::Format(format!("unsupported format '{s}'")))
    }
}

/// Detect the format of `path` from its extension.
///
/// Does no I/O. Fails when the extension is absent or not in the table.
pub fn detect_format(path: impl AsRef<Path>) -> Result<Format> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ImageError::Format(format!("no extension on {}", path.display())))?;
    ext.parse()
        .map_err(|_| ImageError::Format(format!("unsupported extension '{ext}'")))
}

/// Identify the format from the leading magic bytes.
pub fn sniff_format(bytes: &[u8]) -> Result<Format> {
    let guessed = image::guess_format(bytes)
        .map_err(|_| ImageError::Format("content is not a recognized image".to_string()))?;
    Format::from_image_format(guessed)
        .ok_or_else(|| ImageError::Format(format!("unsupported content format {guessed:?}")))
}

/// Detect the format from the extension and check the content agrees.
pub fn verify_content(path: impl AsRef<Path>, bytes: &[u8]) -> Result<Format> {
    let declared = detect_format(&path)?;
    let actual = sniff_format(bytes)?;
    if declared != actual {
        return Err(ImageError::Format(format!(
            "content is {actual}, extension of {} says {declared}",
            path.as_ref().display()
        )));
    }
    Ok(declared)
}

/// All extensions recognized by [`detect_format`].
pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
    EXTENSIONS.iter().map(|(ext, _)| *ext)
}
