//! Open-vocabulary value mappings and lenient readers.
//!
//! Channel payloads arrive with loose typing (amounts as numbers or numeric
//! strings, flags as bools or strings), so the readers here accept every
//! reasonable encoding instead of failing the request.

use serde_json::{Map, Value};

/// String-keyed mapping of JSON values used for `data`, `context`, `result`
/// and metadata payloads.
pub type DataMap = Map<String, Value>;

/// Read a numeric field, accepting numbers and numeric strings.
pub fn map_f64(map: &DataMap, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
}

/// Read a string field, stringifying bare numbers.
pub fn map_str(map: &DataMap, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a boolean field, accepting `true`/`"true"`/`"1"`.
pub fn map_bool(map: &DataMap, key: &str) -> Option<bool> {
    match map.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Read an unsigned integer field with the same leniency as [`map_f64`].
pub fn map_u32(map: &DataMap, key: &str) -> Option<u32> {
    map_f64(map, key).filter(|v| *v >= 0.0).map(|v| v as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> DataMap {
        let Value::Object(map) = json!({
            "amount": "50,000.50",
            "count": 12,
            "flag": "yes",
            "name": "alice",
        }) else {
            unreachable!()
        };
        map
    }

    #[test]
    fn numeric_strings_parse_with_commas() {
        assert_eq!(map_f64(&sample(), "amount"), Some(50_000.5));
    }

    #[test]
    fn numbers_read_as_strings() {
        assert_eq!(map_str(&sample(), "count").as_deref(), Some("12"));
    }

    #[test]
    fn lenient_booleans() {
        assert_eq!(map_bool(&sample(), "flag"), Some(true));
        assert_eq!(map_bool(&sample(), "name"), None);
    }

    #[test]
    fn missing_keys_are_none() {
        assert_eq!(map_f64(&sample(), "absent"), None);
    }
}
