//! Param parsing shared by the built-in filters.

use crate::error::{ImageError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Deserialize `params` into the filter's param type. `null` (a step listed
/// without params) reads as an empty object.
pub(super) fn parse<T: DeserializeOwned>(filter: &str, params: &Value) -> Result<T> {
    let empty = Value::Object(Map::new());
    let params = if params.is_null() { &empty } else { params };
    T::deserialize(params).map_err(|e| ImageError::invalid_params(filter, e.to_string()))
}

/// Like [`parse`], replacing serde's message with `expected`. Used for
/// untagged param shapes where serde only reports "did not match any variant".
pub(super) fn parse_shape<T: DeserializeOwned>(
    filter: &str,
    params: &Value,
    expected: &str,
) -> Result<T> {
    T::deserialize(params).map_err(|_| {
        ImageError::invalid_params(filter, format!("expected {expected}, got {params}"))
    })
}

/// Switch-like filters take `true`, `null` or `{}` to run and `false` to
/// pass the image through.
pub(super) fn enabled(filter: &str, params: &Value) -> Result<bool> {
    match params {
        Value::Bool(on) => Ok(*on),
        Value::Null => Ok(true),
        Value::Object(map) if map.is_empty() => Ok(true),
        other => Err(ImageError::invalid_params(
            filter,
            format!("expected true or false, got {other}"),
        )),
    }
}

pub(super) fn positive(filter: &str, key: &str, value: f32) -> Result<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ImageError::invalid_params(
            filter,
            format!("{key} must be greater than zero, got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sides {
        width: Option<u32>,
    }

    #[test]
    fn null_reads_as_empty_object() {
        let sides: Sides = parse("resize", &Value::Null).unwrap();
        assert_eq!(sides, Sides { width: None });
    }

    #[test]
    fn type_errors_are_invalid_params() {
        let err = parse::<Sides>("resize", &json!({"width": "wide"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParams);
        assert!(err.to_string().starts_with("Invalid parameters for filter 'resize'"));
    }

    #[test]
    fn enabled_accepts_switch_values() {
        assert!(enabled("grayscale", &json!(true)).unwrap());
        assert!(enabled("grayscale", &json!({})).unwrap());
        assert!(!enabled("grayscale", &json!(false)).unwrap());
        assert!(enabled("grayscale", &json!(3)).is_err());
    }

    #[test]
    fn positive_rejects_zero_and_negative() {
        assert_eq!(positive("blur", "sigma", 1.5).unwrap(), 1.5);
        assert!(positive("blur", "sigma", 0.0).is_err());
        assert!(positive("gamma", "correction", -2.0).is_err());
    }
}
