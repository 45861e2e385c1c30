//! Image sources: named backends that map logical paths to bytes.
//!
//! A [`Source`] resolves a logical path (`"photos/cat.jpg"`) to exactly one
//! physical location and reads or writes bytes there. Sources are looked up by
//! name in a [`SourceRegistry`], which is usually built once at startup from
//! the `[sources.*]` tables of the configuration:
//!
//! ```toml
//! default_source = "local"
//!
//! [sources.local]
//! driver = "local"
//! root = "public"
//! ```
//!
//! Only the `local` driver ships with the crate ([`LocalSource`]); other
//! drivers implement [`Source`] and are added with
//! [`SourceRegistry::register`].

mod local;

pub use local::LocalSource;

use crate::config::SourceConfig;
use crate::error::{ImageError, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

/// A storage backend images are read from and written to.
///
/// Implementations are shared between handlers and threads, so every method
/// takes `&self`.
pub trait Source: Send + Sync {
    /// Name of the driver implementing this source (e.g. `"local"`).
    fn driver(&self) -> &str;

    /// Physical location of `path`. Deterministic: the same logical path
    /// always maps to the same location.
    fn locate(&self, path: &str) -> Result<PathBuf>;

    fn exists(&self, path: &str) -> Result<bool>;

    /// Read the whole file. Fails with [`ImageError::FileMissing`] when
    /// nothing exists at the resolved location.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Write `bytes`, replacing any existing file. Implementations must not
    /// leave a partially written file behind on failure.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;
}

/// Name → source lookup table.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn Source>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured source. Unknown driver kinds fail with
    /// [`ImageError::DriverMissing`].
    pub fn from_config(sources: &BTreeMap<String, SourceConfig>) -> Result<Self> {
        let mut registry = Self::new();
        for (name, config) in sources {
            registry.register_arc(name, build_source(config)?);
        }
        Ok(registry)
    }

    /// Bind `name` to `source`. An existing binding is replaced.
    pub fn register(&mut self, name: impl Into<String>, source: impl Source + 'static) {
        self.register_arc(name, Arc::new(source));
    }

    pub fn register_arc(&mut self, name: impl Into<String>, source: Arc<dyn Source>) {
        self.sources.insert(name.into(), source);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Source>> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| ImageError::DriverMissing(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Instantiate one configured source.
pub fn build_source(config: &SourceConfig) -> Result<Arc<dyn Source>> {
    match config.driver.as_str() {
        "local" => Ok(Arc::new(LocalSource::new(&config.root))),
        other => Err(ImageError::DriverMissing(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_helpers::MemorySource;

    #[test]
    fn resolve_unknown_is_driver_missing() {
        let registry = SourceRegistry::new();
        let err = registry.resolve("s3").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DriverMissing);
        assert_eq!(err.to_string(), "Source driver not found: s3");
    }

    #[test]
    fn resolve_returns_registered_instance() {
        let mut registry = SourceRegistry::new();
        let source: Arc<dyn Source> = Arc::new(MemorySource::new());
        registry.register_arc("memory", source.clone());

        let resolved = registry.resolve("memory").unwrap();
        assert!(Arc::ptr_eq(&resolved, &source));
        assert!(registry.has("memory"));
    }

    #[test]
    fn register_replaces_binding() {
        let mut registry = SourceRegistry::new();
        registry.register("public", LocalSource::new("/srv/a"));
        registry.register("public", LocalSource::new("/srv/b"));

        let source = registry.resolve("public").unwrap();
        assert_eq!(
            source.locate("x.jpg").unwrap(),
            PathBuf::from("/srv/b/x.jpg")
        );
        assert_eq!(registry.names(), vec!["public"]);
    }

    #[test]
    fn from_config_builds_local_sources() {
        let mut sources = BTreeMap::new();
        sources.insert(
            "local".to_string(),
            SourceConfig {
                driver: "local".into(),
                root: "/var/www/public".into(),
            },
        );
        let registry = SourceRegistry::from_config(&sources).unwrap();
        let local = registry.resolve("local").unwrap();
        assert_eq!(local.driver(), "local");
        assert_eq!(
            local.locate("image.jpg").unwrap(),
            PathBuf::from("/var/www/public/image.jpg")
        );
    }

    #[test]
    fn from_config_rejects_unknown_driver() {
        let mut sources = BTreeMap::new();
        sources.insert(
            "cloud".to_string(),
            SourceConfig {
                driver: "s3".into(),
                root: "bucket".into(),
            },
        );
        let err = SourceRegistry::from_config(&sources).err().unwrap();
        assert!(matches!(err, ImageError::DriverMissing(ref d) if d == "s3"));
    }
}
