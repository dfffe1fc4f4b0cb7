//! String helpers. Positions count characters, not bytes.

use super::{MAX_STRING_BYTES, exact, expected_type, number, opt_index, string};
use crate::{EvalError, Primitives, Value, ops};

pub(super) fn register(prims: &mut Primitives) {
    prims.register("length", |args, _| {
        exact("length", args, 1, "1")?;
        Ok(Value::from(match &args[0] {
            Value::Str(s) => s.chars().count(),
            Value::List(items) => items.len(),
            Value::Object(map) => map.len(),
            Value::Null => 0,
            other => return Err(expected_type("length", "string or list", other)),
        }))
    });
    prims.register("charAt", |args, _| {
        exact("charAt", args, 2, "2")?;
        let s = string("charAt", &args[0])?;
        let i = number("charAt", &args[1])?;
        let c = if i >= 0.0 { s.chars().nth(i as usize) } else { None };
        Ok(Value::Str(c.map(String::from).unwrap_or_default()))
    });
    prims.register("substring", |args, _| {
        let chars: Vec<char> = string("substring", first(args, "substring")?)?.chars().collect();
        let (start, end) = bounds(
            opt_index("substring", args, 1)?.unwrap_or(0),
            opt_index("substring", args, 2)?.unwrap_or(chars.len()),
            chars.len(),
        );
        Ok(Value::Str(chars[start..end].iter().collect()))
    });
    prims.register("indexOf", |args, _| {
        exact("indexOf", args, 2, "2")?;
        let found = match &args[0] {
            Value::List(items) => items.iter().position(|v| ops::strict_eq(v, &args[1])),
            Value::Str(s) => {
                let needle = string("indexOf", &args[1])?;
                s.find(needle).map(|byte| s[..byte].chars().count())
            }
            other => return Err(expected_type("indexOf", "string or list", other)),
        };
        Ok(found.map(Value::from).unwrap_or(Value::from(-1)))
    });
    prims.register("split", |args, _| {
        exact("split", args, 2, "2")?;
        let s = string("split", &args[0])?;
        let sep = string("split", &args[1])?;
        let parts = if sep.is_empty() {
            s.chars().map(|c| Value::Str(c.to_string())).collect()
        } else {
            s.split(sep).map(Value::from).collect()
        };
        Ok(Value::List(parts))
    });
    prims.register("join", |args, _| {
        let items = super::list("join", first(args, "join")?)?;
        let sep = match args.get(1) {
            Some(v) => string("join", v)?,
            None => ",",
        };
        let parts: Vec<String> = items.iter().map(ops::to_display).collect();
        Ok(Value::Str(parts.join(sep)))
    });
    prims.register("trim", |args, _| unary_str("trim", args, |s| s.trim().to_string()));
    prims.register("toUpper", |args, _| unary_str("toUpper", args, str::to_uppercase));
    prims.register("toLower", |args, _| unary_str("toLower", args, str::to_lowercase));
    prims.register("startsWith", |args, _| {
        binary_str("startsWith", args, |s, p| s.starts_with(p))
    });
    prims.register("endsWith", |args, _| binary_str("endsWith", args, |s, p| s.ends_with(p)));
    prims.register("includes", |args, _| {
        exact("includes", args, 2, "2")?;
        match &args[0] {
            Value::List(items) => Ok(Value::Bool(
                items.iter().any(|v| ops::strict_eq(v, &args[1])),
            )),
            _ => binary_str("includes", args, |s, p| s.contains(p)),
        }
    });
    prims.register("isDigit", |args, _| {
        char_class("isDigit", args, |c| c.is_ascii_digit())
    });
    prims.register("isAlpha", |args, _| {
        char_class("isAlpha", args, |c| c.is_alphabetic() || c == '_' || c == '$')
    });
    prims.register("isSpace", |args, _| char_class("isSpace", args, char::is_whitespace));
    prims.register("replace", |args, _| {
        exact("replace", args, 3, "3")?;
        let s = string("replace", &args[0])?;
        let from = string("replace", &args[1])?;
        let to = string("replace", &args[2])?;
        if from.is_empty() {
            return Ok(Value::from(s));
        }
        Ok(Value::Str(s.replace(from, to)))
    });
    prims.register("repeat", |args, _| {
        exact("repeat", args, 2, "2")?;
        let s = string("repeat", &args[0])?;
        let n = number("repeat", &args[1])?;
        if !n.is_finite() {
            return Err(EvalError::Type("repeat count must be finite".into()));
        }
        if s.is_empty() || n < 1.0 {
            return Ok(Value::from(""));
        }
        let too_long = || EvalError::Type(format!("repeat would exceed {MAX_STRING_BYTES} bytes"));
        if n > MAX_STRING_BYTES as f64 {
            return Err(too_long());
        }
        let n = n as usize;
        if s.len().checked_mul(n).is_none_or(|bytes| bytes > MAX_STRING_BYTES) {
            return Err(too_long());
        }
        Ok(Value::Str(s.repeat(n)))
    });
}

fn first<'a>(args: &'a [Value], name: &str) -> Result<&'a Value, EvalError> {
    args.first()
        .ok_or_else(|| EvalError::arity(name, "at least 1", 0))
}

/// Clamps a half-open range to `len`, swapping reversed bounds.
pub(super) fn bounds(start: usize, end: usize, len: usize) -> (usize, usize) {
    let (start, end) = (start.min(len), end.min(len));
    if start > end { (end, start) } else { (start, end) }
}

fn unary_str(name: &str, args: &[Value], f: impl Fn(&str) -> String) -> Result<Value, EvalError> {
    exact(name, args, 1, "1")?;
    Ok(Value::Str(f(string(name, &args[0])?)))
}

fn binary_str(
    name: &str,
    args: &[Value],
    f: impl Fn(&str, &str) -> bool,
) -> Result<Value, EvalError> {
    exact(name, args, 2, "2")?;
    Ok(Value::Bool(f(string(name, &args[0])?, string(name, &args[1])?)))
}

/// True when the argument is a non-empty string whose every character
/// belongs to the class. Non-strings are never members.
fn char_class(name: &str, args: &[Value], class: impl Fn(char) -> bool) -> Result<Value, EvalError> {
    exact(name, args, 1, "1")?;
    Ok(Value::Bool(match &args[0] {
        Value::Str(s) => !s.is_empty() && s.chars().all(class),
        _ => false,
    }))
}
