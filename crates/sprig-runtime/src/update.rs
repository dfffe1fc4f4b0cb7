//! State update descriptions.
//!
//! An update is either an object mapping paths to values, or a list of
//! `[path, value]` pairs applied in order. A path addresses nested data
//! with `/` separators: `form/fields/0/label` writes the `label` of the
//! first element of `fields` inside `form`. Writes copy each level, like
//! member assignment does.

use rhizome_sprig_ir::{EvalError, Value, ops};

use crate::RuntimeError;

/// The `(path, value)` writes an update describes, or `None` when the value
/// is not an update.
pub fn parse(update: &Value) -> Option<Vec<(String, Value)>> {
    match update {
        Value::Object(map) => Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Value::List(items) => items
            .iter()
            .map(|item| match item.as_list() {
                Some([Value::Str(path), value]) => Some((path.clone(), value.clone())),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

/// Splits a path into segments. Leading, trailing and doubled slashes are
/// ignored.
pub fn segments(path: &str) -> Result<Vec<&str>, RuntimeError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(RuntimeError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// Numeric segments index lists; everything else is a property name.
fn key(target: &Value, segment: &str) -> Value {
    match (target, segment.parse::<usize>()) {
        (Value::List(_), Ok(index)) => Value::from(index),
        _ => Value::from(segment),
    }
}

/// `target` with the value at `path` replaced. Missing levels are created
/// as objects.
pub fn set_in(target: &Value, path: &[&str], value: Value) -> Result<Value, EvalError> {
    let Some((head, rest)) = path.split_first() else {
        return Ok(value);
    };
    let key = key(target, head);
    let child = set_in(&ops::get(target, &key), rest, value)?;
    ops::set(target, &key, child)
}

pub fn get_in(target: &Value, path: &[&str]) -> Value {
    path.iter()
        .fold(target.clone(), |value, segment| ops::get(&value, &key(&value, segment)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn from(json: serde_json::Value) -> Value {
        Value::from_json(&json)
    }

    #[test]
    fn test_parse_forms() {
        let pairs = parse(&from(json!([["a", 1], ["b/c", 2]]))).unwrap();
        assert_eq!(pairs[1], ("b/c".to_string(), Value::Number(2.0)));
        assert_eq!(parse(&from(json!({"x": true}))).unwrap().len(), 1);
        assert!(parse(&from(json!([1, 2]))).is_none());
        assert!(parse(&Value::Number(1.0)).is_none());
        assert_eq!(parse(&from(json!([]))), Some(vec![]));
    }

    #[test]
    fn test_segments() {
        assert_eq!(segments("/a//b/").unwrap(), vec!["a", "b"]);
        assert!(matches!(segments("//"), Err(RuntimeError::InvalidPath(_))));
    }

    #[test]
    fn test_set_in_nested() {
        let state = from(json!({"form": {"fields": [{"label": "a"}, {"label": "b"}]}}));
        let updated = set_in(&state, &["form", "fields", "1", "label"], Value::from("z")).unwrap();
        assert_eq!(
            updated.to_json(),
            json!({"form": {"fields": [{"label": "a"}, {"label": "z"}]}})
        );
        // The original is untouched.
        assert_eq!(get_in(&state, &["form", "fields", "1", "label"]), Value::from("b"));
    }

    #[test]
    fn test_set_in_creates_levels() {
        let updated = set_in(&Value::Null, &["a", "b"], Value::Number(1.0)).unwrap();
        assert_eq!(updated.to_json(), json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_set_in_rejects_scalars() {
        assert!(set_in(&Value::Number(1.0), &["a"], Value::Null).is_err());
    }
}
