//! Field maps.
//!
//! Forms, accumulators and render bindings are all string-keyed JSON maps.
//! Merges build a new map and leave their inputs untouched.

use serde_json::{Map, Value};

/// A string-keyed map of field values.
pub type Fields = Map<String, Value>;

/// Merge `layers` left to right into a new map; later layers win.
pub fn merge_fields<'a, I>(layers: I) -> Fields
where
    I: IntoIterator<Item = &'a Fields>,
{
    let mut merged = Fields::new();
    for layer in layers {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// A copy of `fields` with `key` set to `value`.
pub fn with_field(fields: &Fields, key: impl Into<String>, value: impl Into<Value>) -> Fields {
    let mut copy = fields.clone();
    copy.insert(key.into(), value.into());
    copy
}

/// Interpret a hook result as a map; anything else counts as empty.
pub fn fields_from(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_later_layers_win() {
        let form = fields_from(json!({"name": "Al", "step": "signup"}));
        let errors = fields_from(json!({"name": "too short"}));

        let merged = merge_fields([&form, &errors]);
        assert_eq!(merged["name"], json!("too short"));
        assert_eq!(merged["step"], json!("signup"));
        assert_eq!(form["name"], json!("Al"));
    }

    #[test]
    fn test_non_map_counts_as_empty() {
        assert!(fields_from(json!(true)).is_empty());
        assert!(fields_from(Value::Null).is_empty());
    }

    #[test]
    fn test_with_field_copies() {
        let base = fields_from(json!({"a": 1}));
        let next = with_field(&base, "b", 2);
        assert_eq!(next.len(), 2);
        assert_eq!(base.len(), 1);
    }
}
