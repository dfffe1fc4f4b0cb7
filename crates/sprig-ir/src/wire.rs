//! Wire-safe JSON encoding of list-expressions.
//!
//! Lists become JSON arrays and symbols become plain JSON strings. String
//! literals are prefixed with [`STRING_SENTINEL`] so a decoder can tell
//! `"x"` the literal from `x` the variable reference.

use crate::Value;
use crate::value::json_number;
use thiserror::Error;

/// Private-use code point marking a string literal.
pub const STRING_SENTINEL: char = '\u{E000}';

#[derive(Debug, Error)]
pub enum WireError {
    #[error("{0} values cannot be encoded")]
    NotEncodable(&'static str),

    #[error("non-finite number cannot be encoded: {0}")]
    NonFinite(f64),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn encode(value: &Value) -> Result<serde_json::Value, WireError> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => {
            serde_json::Value::Number(json_number(*n).ok_or(WireError::NonFinite(*n))?)
        }
        Value::Str(s) => serde_json::Value::String(format!("{STRING_SENTINEL}{s}")),
        Value::Symbol(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(encode).collect::<Result<_, _>>()?)
        }
        Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), encode(v)?)))
                .collect::<Result<_, WireError>>()?,
        ),
        Value::Closure(_) | Value::Native(_) => {
            return Err(WireError::NotEncodable(value.type_name()));
        }
    })
}

pub fn decode(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::String(s) => match s.strip_prefix(STRING_SENTINEL) {
            Some(literal) => Value::Str(literal.to_string()),
            None => Value::Symbol(s.clone()),
        },
        serde_json::Value::Array(items) => Value::List(items.iter().map(decode).collect()),
        serde_json::Value::Object(map) => Value::Object(
            map.iter().map(|(k, v)| (k.clone(), decode(v))).collect(),
        ),
        other => Value::from_json(other),
    }
}

pub fn to_string(value: &Value) -> Result<String, WireError> {
    Ok(serde_json::to_string(&encode(value)?)?)
}

pub fn to_string_pretty(value: &Value) -> Result<String, WireError> {
    Ok(serde_json::to_string_pretty(&encode(value)?)?)
}

pub fn from_str(s: &str) -> Result<Value, WireError> {
    let json: serde_json::Value = serde_json::from_str(s)?;
    Ok(decode(&json))
}
