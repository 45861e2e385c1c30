use super::Source;
use crate::error::{ImageError, Result};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

/// Local filesystem source rooted at a public directory.
///
/// Logical paths are relative to `root`; a leading `/` is accepted (URL
/// style) and stripped. Paths that would escape the root are rejected.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate a logical path and return it as a relative path.
    fn relative(path: &str) -> Result<&Path> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative.as_os_str().is_empty() {
            return Err(ImageError::InvalidPath("empty path".to_string()));
        }
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ImageError::InvalidPath(format!(
                "{path} resolves outside the source root"
            )));
        }
        Ok(relative)
    }
}

impl Source for LocalSource {
    fn driver(&self) -> &str {
        "local"
    }

    fn locate(&self, path: &str) -> Result<PathBuf> {
        Ok(self.root.join(Self::relative(path)?))
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.locate(path)?.is_file())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let physical = self.locate(path)?;
        // Only regular files hold images; a directory reads as missing.
        if physical.is_dir() {
            return Err(ImageError::FileMissing(physical));
        }
        match std::fs::read(&physical) {
            Ok(bytes) => {
                tracing::debug!(path = %physical.display(), size_bytes = bytes.len(), "read source file");
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ImageError::FileMissing(physical))
            }
            Err(e) => Err(ImageError::Io(e)),
        }
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let physical = self.locate(path)?;
        let parent = physical.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent)?;

        // Temp file in the destination directory so the final rename stays on
        // one filesystem and is atomic.
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&physical).map_err(|e| ImageError::Io(e.error))?;

        tracing::debug!(path = %physical.display(), size_bytes = bytes.len(), "wrote source file");
        Ok(())
    }
}
