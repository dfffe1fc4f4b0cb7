//! Higher-order list algorithms shared by the primitives and the evaluator's
//! higher-order forms.
//!
//! The function is called through the [`Host`] with `(item, index)`, or
//! `(acc, item, index)` for [`reduce`].

use super::Host;
use crate::{EvalError, Value, ops};

/// Maps an alias to its canonical name.
pub fn canonical(name: &str) -> Option<&'static str> {
    Some(match name {
        "map" => "map",
        "filter" => "filter",
        "find" => "find",
        "findIndex" | "find-index" => "findIndex",
        "count" => "count",
        "sortBy" | "sort-by" => "sortBy",
        "reduce" | "fold" => "reduce",
        _ => return None,
    })
}

/// Runs one of the single-function algorithms by canonical name.
pub fn apply(name: &str, items: &[Value], f: &Value, host: &dyn Host) -> Result<Value, EvalError> {
    match name {
        "map" => map(items, f, host),
        "filter" => filter(items, f, host),
        "find" => Ok(position(items, f, host)?
            .map(|i| items[i].clone())
            .unwrap_or_default()),
        "findIndex" => Ok(position(items, f, host)?
            .map(Value::from)
            .unwrap_or(Value::from(-1))),
        "count" => count(items, f, host),
        "sortBy" => sort_by(items, f, host),
        other => Err(EvalError::UnknownFunction(other.to_string())),
    }
}

fn call(f: &Value, item: &Value, i: usize, host: &dyn Host) -> Result<Value, EvalError> {
    host.call(f, vec![item.clone(), Value::from(i)])
}

pub fn map(items: &[Value], f: &Value, host: &dyn Host) -> Result<Value, EvalError> {
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        out.push(call(f, item, i, host)?);
    }
    Ok(Value::List(out))
}

pub fn filter(items: &[Value], f: &Value, host: &dyn Host) -> Result<Value, EvalError> {
    let mut out = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if ops::truthy(&call(f, item, i, host)?) {
            out.push(item.clone());
        }
    }
    Ok(Value::List(out))
}

/// Index of the first item for which `f` is truthy.
pub fn position(items: &[Value], f: &Value, host: &dyn Host) -> Result<Option<usize>, EvalError> {
    for (i, item) in items.iter().enumerate() {
        if ops::truthy(&call(f, item, i, host)?) {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

pub fn count(items: &[Value], f: &Value, host: &dyn Host) -> Result<Value, EvalError> {
    let mut n = 0usize;
    for (i, item) in items.iter().enumerate() {
        if ops::truthy(&call(f, item, i, host)?) {
            n += 1;
        }
    }
    Ok(Value::from(n))
}

/// Stable sort by the key `f` returns, using [`ops::order`].
pub fn sort_by(items: &[Value], f: &Value, host: &dyn Host) -> Result<Value, EvalError> {
    let mut keyed = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        keyed.push((call(f, item, i, host)?, item.clone()));
    }
    keyed.sort_by(|a, b| ops::order(&a.0, &b.0));
    Ok(Value::List(keyed.into_iter().map(|(_, v)| v).collect()))
}

pub fn reduce(items: &[Value], f: &Value, init: Value, host: &dyn Host) -> Result<Value, EvalError> {
    let mut acc = init;
    for (i, item) in items.iter().enumerate() {
        acc = host.call(f, vec![acc, item.clone(), Value::from(i)])?;
    }
    Ok(acc)
}
