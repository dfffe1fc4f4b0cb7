//! Operator semantics shared by both execution backends.
//!
//! Equality is strict, truthiness follows the host-language convention
//! (`null`, `false`, `0`, `NaN` and `""` are falsy), and `+` concatenates
//! when either operand is a string.

use crate::{EvalError, Value};
use std::cmp::Ordering;

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::Str(s) => !s.is_empty(),
        _ => true,
    }
}

/// Strict equality: values of different kinds are never equal.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    a == b
}

pub fn add(a: &Value, b: &Value) -> Result<Value, EvalError> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok(Value::Number(x + y)),
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            Ok(Value::Str(format!("{}{}", to_display(a), to_display(b))))
        }
        _ => Err(type_error("+", a, b)),
    }
}

pub fn sub(a: &Value, b: &Value) -> Result<Value, EvalError> {
    arith("-", a, b, |x, y| x - y)
}

pub fn mul(a: &Value, b: &Value) -> Result<Value, EvalError> {
    arith("*", a, b, |x, y| x * y)
}

/// Division follows IEEE semantics: dividing by zero yields an infinity.
pub fn div(a: &Value, b: &Value) -> Result<Value, EvalError> {
    arith("/", a, b, |x, y| x / y)
}

pub fn rem(a: &Value, b: &Value) -> Result<Value, EvalError> {
    arith("%", a, b, |x, y| x % y)
}

pub fn neg(a: &Value) -> Result<Value, EvalError> {
    match a {
        Value::Number(n) => Ok(Value::Number(-n)),
        other => Err(EvalError::Type(format!(
            "cannot negate {}",
            other.type_name()
        ))),
    }
}

fn arith(op: &str, a: &Value, b: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, EvalError> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok(Value::Number(f(*x, *y))),
        _ => Err(type_error(op, a, b)),
    }
}

fn type_error(op: &str, a: &Value, b: &Value) -> EvalError {
    EvalError::Type(format!(
        "cannot apply {op} to {} and {}",
        a.type_name(),
        b.type_name()
    ))
}

/// Relational comparison. Numbers compare numerically, strings
/// lexicographically; any other pairing is a type error. `None` means the
/// operands are unordered (a `NaN` is involved).
pub fn compare(op: &str, a: &Value, b: &Value) -> Result<Option<Ordering>, EvalError> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok(x.partial_cmp(y)),
        (Value::Str(x), Value::Str(y)) => Ok(Some(x.cmp(y))),
        _ => Err(type_error(op, a, b)),
    }
}

pub fn lt(a: &Value, b: &Value) -> Result<bool, EvalError> {
    Ok(compare("<", a, b)? == Some(Ordering::Less))
}

pub fn le(a: &Value, b: &Value) -> Result<bool, EvalError> {
    Ok(matches!(
        compare("<=", a, b)?,
        Some(Ordering::Less | Ordering::Equal)
    ))
}

pub fn gt(a: &Value, b: &Value) -> Result<bool, EvalError> {
    Ok(compare(">", a, b)? == Some(Ordering::Greater))
}

pub fn ge(a: &Value, b: &Value) -> Result<bool, EvalError> {
    Ok(matches!(
        compare(">=", a, b)?,
        Some(Ordering::Greater | Ordering::Equal)
    ))
}

/// Total order used for sorting mixed values: kinds first, then contents.
pub fn order(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::Str(_) => 3,
            Value::Symbol(_) => 4,
            Value::List(_) => 5,
            Value::Object(_) => 6,
            Value::Closure(_) | Value::Native(_) => 7,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::Str(x), Value::Str(y)) | (Value::Symbol(x), Value::Symbol(y)) => x.cmp(y),
        (Value::List(x), Value::List(y)) => x
            .iter()
            .zip(y)
            .map(|(p, q)| order(p, q))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Formats a number the way the surface language prints it: integral values
/// carry no fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

/// Text used when a value is concatenated into a string.
pub fn to_display(value: &Value) -> String {
    match value {
        Value::Str(s) | Value::Symbol(s) => s.clone(),
        Value::Number(n) => format_number(*n),
        Value::List(items) => items.iter().map(to_display).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Converts a value used as an object key into its string form.
pub fn key_string(key: &Value) -> Result<String, EvalError> {
    match key {
        Value::Str(s) | Value::Symbol(s) => Ok(s.clone()),
        Value::Number(n) => Ok(format_number(*n)),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(EvalError::Type(format!(
            "cannot use {} as a key",
            other.type_name()
        ))),
    }
}

/// How far past the end of a list a write may land. The gap is filled
/// with nulls.
pub const MAX_LIST_GAP: usize = 65_536;

/// Integral numbers exactly representable as `f64` index lists and strings.
fn index(key: &Value) -> Option<usize> {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    match key {
        Value::Number(n) if *n >= 0.0 && *n <= MAX_SAFE && n.fract() == 0.0 => Some(*n as usize),
        _ => None,
    }
}

fn is_length(key: &Value) -> bool {
    matches!(key, Value::Str(s) | Value::Symbol(s) if s == "length")
}

/// Property or element read. Misses yield null rather than failing.
pub fn get(target: &Value, key: &Value) -> Value {
    match target {
        Value::Object(map) => key_string(key)
            .ok()
            .and_then(|k| map.get(&k).cloned())
            .unwrap_or(Value::Null),
        Value::List(items) if is_length(key) => Value::from(items.len()),
        Value::List(items) => index(key)
            .and_then(|i| items.get(i).cloned())
            .unwrap_or(Value::Null),
        Value::Str(s) if is_length(key) => Value::from(s.chars().count()),
        Value::Str(s) => index(key)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::Str(c.to_string()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Property or element write. Returns the updated copy; the original value
/// is left untouched. Writing into null creates an object.
pub fn set(target: &Value, key: &Value, value: Value) -> Result<Value, EvalError> {
    match target {
        Value::Object(map) => {
            let mut map = map.clone();
            map.insert(key_string(key)?, value);
            Ok(Value::Object(map))
        }
        Value::List(items) => {
            let i = index(key).ok_or_else(|| {
                EvalError::Type(format!("invalid list index: {}", key))
            })?;
            if i > items.len().saturating_add(MAX_LIST_GAP) {
                return Err(EvalError::Type(format!(
                    "list index {} is too far past the end (length {})",
                    key,
                    items.len()
                )));
            }
            let mut items = items.clone();
            if items.len() <= i {
                items.resize(i + 1, Value::Null);
            }
            items[i] = value;
            Ok(Value::List(items))
        }
        Value::Null => {
            let mut map = crate::Object::new();
            map.insert(key_string(key)?, value);
            Ok(Value::Object(map))
        }
        other => Err(EvalError::Type(format!(
            "cannot set property on {}",
            other.type_name()
        ))),
    }
}
