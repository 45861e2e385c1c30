//! Filter chain configuration, normalization and execution.
//!
//! Callers describe the filters to run in one of two shapes:
//!
//! ```json
//! {"filters": [{"name": "resize", "params": {"width": 100}}, {"name": "rotate", "params": 90}]}
//! ```
//!
//! ```json
//! {"width": 100, "height": 90, "crop": true, "rotate": 90, "grayscale": true}
//! ```
//!
//! The first is an explicit, ordered list. The second is shorthand: the
//! reserved keys `width`, `height` and boolean `crop` fold into one `resize`
//! step, `rotate` takes a bare angle, preset names expand into their options,
//! and every other key names a registered filter with its params inlined.
//! Shorthand steps run in [`FilterStage`] order (geometry, orientation,
//! cosmetic), keeping first-appearance order within a stage.
//!
//! Both shapes go through [`normalize`] into the same `Vec<FilterStep>`, which
//! [`execute`] threads the image through. Unknown names always fail with
//! [`ImageError::FilterMissing`]; nothing is silently ignored.

use crate::error::{ImageError, Result};
use crate::filters::{FilterRegistry, FilterStage};
use crate::imaging::ImagingBackend;
use crate::raster::Image;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Named shorthand option sets, selected in a shorthand config like a switch
/// (`{"thumbnail": true}`).
pub type Presets = BTreeMap<String, Map<String, Value>>;

/// Key introducing the explicit shape.
const FILTERS_KEY: &str = "filters";

/// Shorthand keys folded into a single `resize` step.
const RESIZE_KEYS: [&str; 3] = ["width", "height", "crop"];

/// One filter invocation in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterStep {
    pub name: String,
    #[serde(default)]
    pub params: Value,
}

impl FilterStep {
    pub fn new(name: impl Into<String>, params: Value) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterChainConfig {
    /// Ordered list of steps, run as given.
    Explicit(Vec<FilterStep>),
    /// Option map, ordered by stage on normalization.
    Shorthand(Map<String, Value>),
}

impl Default for FilterChainConfig {
    fn default() -> Self {
        Self::Shorthand(Map::new())
    }
}

impl FilterChainConfig {
    /// The identity chain.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Classify a JSON value. `null` is the empty chain; a map holding
    /// `filters` is explicit and must hold nothing else; any other map is
    /// shorthand.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::empty()),
            Value::Object(mut map) => match map.remove(FILTERS_KEY) {
                None => Ok(Self::Shorthand(map)),
                Some(_) if !map.is_empty() => {
                    let others: Vec<&str> = map.keys().map(String::as_str).collect();
                    Err(ImageError::InvalidConfig(format!(
                        "`{FILTERS_KEY}` cannot be combined with other keys ({})",
                        others.join(", ")
                    )))
                }
                Some(list) => serde_json::from_value(list)
                    .map(Self::Explicit)
                    .map_err(|e| ImageError::InvalidConfig(format!("`{FILTERS_KEY}`: {e}"))),
            },
            other => Err(ImageError::InvalidConfig(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Explicit(steps) => steps.is_empty(),
            Self::Shorthand(map) => map.is_empty(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Explicit(steps) => {
                let steps = steps
                    .iter()
                    .map(|s| serde_json::json!({"name": s.name, "params": s.params}))
                    .collect();
                let mut map = Map::new();
                map.insert(FILTERS_KEY.to_string(), Value::Array(steps));
                Value::Object(map)
            }
            Self::Shorthand(map) => Value::Object(map.clone()),
        }
    }
}

impl From<Map<String, Value>> for FilterChainConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self::Shorthand(map)
    }
}

impl From<Vec<FilterStep>> for FilterChainConfig {
    fn from(steps: Vec<FilterStep>) -> Self {
        Self::Explicit(steps)
    }
}

impl<'de> Deserialize<'de> for FilterChainConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl Serialize for FilterChainConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// `false` and `null` deselect a shorthand entry.
fn is_deselected(value: &Value) -> bool {
    matches!(value, Value::Bool(false) | Value::Null)
}

/// Replace selected preset keys with their options. Presets expand in order
/// of appearance; explicitly given options override preset values.
fn expand_presets(options: &Map<String, Value>, presets: &Presets) -> Result<Map<String, Value>> {
    let mut expanded = Map::new();
    for (key, value) in options {
        let Some(preset) = presets.get(key) else {
            continue;
        };
        match value {
            Value::Bool(true) => {
                for (k, v) in preset {
                    expanded.insert(k.clone(), v.clone());
                }
            }
            Value::Bool(false) | Value::Null => {}
            other => {
                return Err(ImageError::InvalidConfig(format!(
                    "preset `{key}` is selected with true or false, got {other}"
                )));
            }
        }
    }
    for (key, value) in options {
        if !presets.contains_key(key) {
            expanded.insert(key.clone(), value.clone());
        }
    }
    Ok(expanded)
}

fn normalize_shorthand(
    options: &Map<String, Value>,
    registry: &FilterRegistry,
    presets: &Presets,
) -> Result<Vec<FilterStep>> {
    let options = expand_presets(options, presets)?;
    let mut staged: Vec<(FilterStage, FilterStep)> = Vec::with_capacity(options.len());
    let mut resize_slot: Option<usize> = None;

    for (key, value) in &options {
        let folds_into_resize =
            RESIZE_KEYS.contains(&key.as_str()) && (key != "crop" || !value.is_object());

        if folds_into_resize {
            let filter = registry
                .get("resize")
                .map_err(|_| ImageError::FilterMissing(key.clone()))?;
            let slot = *resize_slot.get_or_insert_with(|| {
                staged.push((filter.stage(), FilterStep::new("resize", Value::Object(Map::new()))));
                staged.len() - 1
            });
            if !value.is_null()
                && let Value::Object(params) = &mut staged[slot].1.params
            {
                params.insert(key.clone(), value.clone());
            }
            continue;
        }

        let filter = registry.get(key)?;
        if is_deselected(value) {
            continue;
        }
        let params = match (key.as_str(), value) {
            ("rotate", Value::Number(_)) => serde_json::json!({"angle": value}),
            _ => value.clone(),
        };
        staged.push((filter.stage(), FilterStep::new(key.clone(), params)));
    }

    staged.sort_by_key(|(stage, _)| *stage);
    Ok(staged.into_iter().map(|(_, step)| step).collect())
}

/// Turn either config shape into the canonical ordered list of steps.
///
/// Every referenced filter must be registered in `registry`; unknown names
/// fail with [`ImageError::FilterMissing`] before any pixel is touched.
pub fn normalize(
    config: &FilterChainConfig,
    registry: &FilterRegistry,
    presets: &Presets,
) -> Result<Vec<FilterStep>> {
    match config {
        FilterChainConfig::Explicit(steps) => {
            for step in steps {
                registry.get(&step.name)?;
            }
            Ok(steps.clone())
        }
        FilterChainConfig::Shorthand(options) => normalize_shorthand(options, registry, presets),
    }
}

/// Run `image` through `steps` in order. No steps means the input comes back
/// unchanged.
pub fn execute(
    image: Image,
    steps: &[FilterStep],
    registry: &FilterRegistry,
    backend: &dyn ImagingBackend,
) -> Result<Image> {
    steps.iter().try_fold(image, |image, step| {
        let filter = registry.get(&step.name)?;
        let image = filter.apply(backend, image, &step.params)?;
        tracing::trace!(
            filter = %step.name,
            width = image.width(),
            height = image.height(),
            "applied filter"
        );
        Ok(image)
    })
}

/// [`normalize`] then [`execute`].
pub fn apply_chain(
    image: Image,
    config: &FilterChainConfig,
    registry: &FilterRegistry,
    presets: &Presets,
    backend: &dyn ImagingBackend,
) -> Result<Image> {
    let steps = normalize(config, registry, presets)?;
    execute(image, &steps, registry, backend)
}
