//! Typed extraction from tool parameter maps.
//!
//! Every helper treats an explicit `null` the same as an absent key, and
//! reports a wrong type as `INVALID_PARAMS` naming the parameter.

use serde_json::Value;

use crate::mcp::protocol::{JsonRpcError, Params};
use crate::mcp::tool::invalid_parameter;

fn lookup<'a>(params: &'a Params, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|v| !v.is_null())
}

/// An optional string.
///
/// # Errors
///
/// Returns `INVALID_PARAMS` if the value is not a string.
pub fn optional_str<'a>(params: &'a Params, key: &str) -> Result<Option<&'a str>, JsonRpcError> {
    match lookup(params, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(invalid_parameter(key, "must be a string")),
    }
}

/// A required, non-blank string.
///
/// # Errors
///
/// Returns `INVALID_PARAMS` if the value is missing, blank, or not a string.
pub fn required_str<'a>(params: &'a Params, key: &str) -> Result<&'a str, JsonRpcError> {
    match optional_str(params, key)? {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(invalid_parameter(key, "parameter is required")),
    }
}

/// An optional boolean.
///
/// # Errors
///
/// Returns `INVALID_PARAMS` if the value is not a boolean.
pub fn optional_bool(params: &Params, key: &str) -> Result<Option<bool>, JsonRpcError> {
    match lookup(params, key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(invalid_parameter(key, "must be a boolean")),
    }
}

/// A boolean with a fallback.
///
/// # Errors
///
/// Returns `INVALID_PARAMS` if the value is not a boolean.
pub fn bool_or(params: &Params, key: &str, default: bool) -> Result<bool, JsonRpcError> {
    Ok(optional_bool(params, key)?.unwrap_or(default))
}

/// An optional number. Numeric strings such as `"35.68"` are accepted.
///
/// # Errors
///
/// Returns `INVALID_PARAMS` if the value is neither a number nor a numeric string.
pub fn optional_number(params: &Params, key: &str) -> Result<Option<f64>, JsonRpcError> {
    match lookup(params, key) {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid_parameter(key, "must be a number")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Some)
            .ok_or_else(|| invalid_parameter(key, "must be a number")),
        Some(_) => Err(invalid_parameter(key, "must be a number")),
    }
}

/// A required number.
///
/// # Errors
///
/// Returns `INVALID_PARAMS` if the value is missing or not numeric.
pub fn required_number(params: &Params, key: &str) -> Result<f64, JsonRpcError> {
    optional_number(params, key)?.ok_or_else(|| invalid_parameter(key, "parameter is required"))
}

/// An optional integer.
///
/// # Errors
///
/// Returns `INVALID_PARAMS` if the value is not an integer.
pub fn optional_i64(params: &Params, key: &str) -> Result<Option<i64>, JsonRpcError> {
    match lookup(params, key) {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid_parameter(key, "must be an integer")),
        Some(_) => Err(invalid_parameter(key, "must be an integer")),
    }
}

/// An optional list of strings; absent yields an empty list.
///
/// # Errors
///
/// Returns `INVALID_PARAMS` if the value is not an array of strings.
pub fn str_list<'a>(params: &'a Params, key: &str) -> Result<Vec<&'a str>, JsonRpcError> {
    match lookup(params, key) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| invalid_parameter(key, "must be an array of strings"))
            })
            .collect(),
        Some(_) => Err(invalid_parameter(key, "must be an array of strings")),
    }
}

/// An optional nested object.
///
/// # Errors
///
/// Returns `INVALID_PARAMS` if the value is not an object.
pub fn optional_object<'a>(params: &'a Params, key: &str) -> Result<Option<&'a Params>, JsonRpcError> {
    match lookup(params, key) {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(invalid_parameter(key, "must be an object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("test params must be an object"),
        }
    }

    #[test]
    fn strings() {
        let p = params(json!({"a": "x", "b": 1, "c": null, "d": "  "}));
        assert_eq!(optional_str(&p, "a").unwrap(), Some("x"));
        assert_eq!(optional_str(&p, "c").unwrap(), None);
        assert_eq!(optional_str(&p, "missing").unwrap(), None);
        assert!(optional_str(&p, "b").is_err());
        assert!(required_str(&p, "d").is_err());
        assert_eq!(required_str(&p, "a").unwrap(), "x");
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        let p = params(json!({"lat": 35.5, "lon": "139.7", "bad": "east", "flag": true}));
        assert_eq!(optional_number(&p, "lat").unwrap(), Some(35.5));
        assert_eq!(optional_number(&p, "lon").unwrap(), Some(139.7));
        assert!(optional_number(&p, "bad").is_err());
        assert!(optional_number(&p, "flag").is_err());
        assert!(required_number(&p, "missing").is_err());
    }

    #[test]
    fn integers_and_bools() {
        let p = params(json!({"n": 3, "f": 1.5, "b": false}));
        assert_eq!(optional_i64(&p, "n").unwrap(), Some(3));
        assert!(optional_i64(&p, "f").is_err());
        assert!(!bool_or(&p, "b", true).unwrap());
        assert!(bool_or(&p, "missing", true).unwrap());
        assert!(optional_bool(&p, "n").is_err());
    }

    #[test]
    fn string_lists() {
        let p = params(json!({"zones": ["UTC", "Asia/Tokyo"], "mixed": ["UTC", 1]}));
        assert_eq!(str_list(&p, "zones").unwrap(), vec!["UTC", "Asia/Tokyo"]);
        assert!(str_list(&p, "missing").unwrap().is_empty());
        let err = str_list(&p, "mixed").unwrap_err();
        assert!(err.message.contains("'mixed'"));
    }

    #[test]
    fn objects() {
        let p = params(json!({"rel": {"amount": 1}, "flat": 2}));
        assert!(optional_object(&p, "rel").unwrap().is_some());
        assert!(optional_object(&p, "flat").is_err());
    }
}
