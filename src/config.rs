//! Configuration module.
//!
//! Handles loading, validating, and merging `imgflow.toml`. Stock defaults
//! are serialized to a TOML table and the user file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! default_source = "local"  # Source bound to handlers built from config
//!
//! [sources.local]
//! driver = "local"          # Only "local" ships with imgflow
//! root = "public"           # Directory logical paths are resolved against
//!
//! [output]
//! quality = 90              # JPEG quality (1-100)
//!
//! [presets.thumbnail]       # Select with {"thumbnail": true}
//! width = 150
//! height = 150
//! crop = true
//!
//! [url]
//! marker = "filters"        # photo-filters(300x200-crop).jpg
//! separator = "-"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [logging]
//! level = "info"            # trace, debug, info, warn, error, off
//! format = "pretty"         # pretty or json
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::chain::Presets;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "imgflow.toml";

/// Shorthand keys with built-in meaning; presets may not shadow them.
const RESERVED_KEYS: [&str; 5] = ["filters", "width", "height", "crop", "rotate"];

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `imgflow.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name of the source handlers bind to.
    pub default_source: String,
    /// Named storage sources.
    pub sources: BTreeMap<String, SourceConfig>,
    /// Encoding settings for `save`.
    pub output: OutputConfig,
    /// Named shorthand option sets.
    pub presets: Presets,
    /// Filter chains encoded in file names.
    pub url: UrlConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    pub logging: LoggingConfig,
}

fn default_sources() -> BTreeMap<String, SourceConfig> {
    BTreeMap::from([("local".to_string(), SourceConfig::default())])
}

fn default_presets() -> Presets {
    let mut thumbnail = Map::new();
    thumbnail.insert("width".into(), Value::from(150));
    thumbnail.insert("height".into(), Value::from(150));
    thumbnail.insert("crop".into(), Value::Bool(true));
    Presets::from([("thumbnail".to_string(), thumbnail)])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_source: "local".to_string(),
            sources: default_sources(),
            output: OutputConfig::default(),
            presets: default_presets(),
            url: UrlConfig::default(),
            processing: ProcessingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if !self.sources.contains_key(&self.default_source) {
            return Err(ConfigError::Validation(format!(
                "default_source '{}' is not defined under [sources]",
                self.default_source
            )));
        }
        if let Some((name, _)) = self
            .sources
            .iter()
            .find(|(_, s)| s.root.as_os_str().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "sources.{name}.root must not be empty"
            )));
        }
        if let Some(name) = self
            .presets
            .keys()
            .find(|name| RESERVED_KEYS.contains(&name.as_str()))
        {
            return Err(ConfigError::Validation(format!(
                "preset name '{name}' is reserved"
            )));
        }
        self.url.validate()?;
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

/// One named storage source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Driver kind. Unknown kinds fail when the source registry is built.
    pub driver: String,
    /// Root directory for the `local` driver.
    pub root: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            driver: "local".to_string(),
            root: PathBuf::from("public"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// JPEG encoding quality. PNG, GIF and WebP are written lossless.
    pub quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

/// How filter chains are spelled inside file names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlConfig {
    pub marker: String,
    pub separator: String,
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            marker: "filters".to_string(),
            separator: "-".to_string(),
        }
    }
}

impl UrlConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.marker.is_empty() || !self.marker.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Validation(
                "url.marker must be non-empty and alphanumeric".into(),
            ));
        }
        let mut chars = self.separator.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_ascii_alphanumeric() && !"(),._".contains(c) => Ok(()),
            _ => Err(ConfigError::Validation(
                "url.separator must be a single punctuation character other than ( ) , . _".into(),
            )),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// A missing file yields the stock defaults. Otherwise user values are merged
/// on top of the defaults, unknown keys are rejected and the result is
/// validated.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `imgflow.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgflow Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# Source that handlers bind to when built from this file.
default_source = "local"

# ---------------------------------------------------------------------------
# Sources
# ---------------------------------------------------------------------------
# Each [sources.<name>] table defines one named storage backend.
# Logical paths ("photos/cat.jpg") are resolved relative to `root`;
# paths containing ".." are rejected.
[sources.local]
driver = "local"
root = "public"

# ---------------------------------------------------------------------------
# Output encoding
# ---------------------------------------------------------------------------
[output]
# JPEG quality (1 = worst, 100 = best). PNG, GIF and WebP are lossless.
quality = 90

# ---------------------------------------------------------------------------
# Presets
# ---------------------------------------------------------------------------
# Named shorthand option sets. Select one with {"thumbnail": true} or
# `--preset thumbnail`; options given explicitly override preset values.
[presets.thumbnail]
width = 150
height = 150
crop = true

# ---------------------------------------------------------------------------
# Filter URLs
# ---------------------------------------------------------------------------
# File names may carry a filter chain between marker parentheses:
#   photos/cat-filters(300x200-crop-rotate(90)).jpg
[url]
marker = "filters"
separator = "-"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers for `imgflow batch`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# trace, debug, info, warn, error or off. RUST_LOG takes precedence.
level = "info"
# "pretty" for humans, "json" for log collectors. Logs go to stderr.
format = "pretty"
"##
}
