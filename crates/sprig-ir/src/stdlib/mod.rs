//! Primitive registry and the standard primitive library.
//!
//! Each submodule registers one family of primitives:
//! - `base`: operators, conversions and type predicates
//! - `math`: numeric helpers
//! - `text`: string helpers
//! - `seq`: list helpers and closure-based higher-order primitives
//! - `obj`: object helpers
//!
//! The algorithms behind the higher-order primitives live in [`higher`].

mod base;
pub mod higher;
mod math;
mod obj;
mod seq;
mod text;

use crate::{EvalError, Value};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Longest list `range` builds.
pub const MAX_SEQUENCE_LEN: usize = 1 << 20;

/// Largest string `repeat` builds, in bytes.
pub const MAX_STRING_BYTES: usize = 1 << 24;

/// Callback surface a primitive sees from the backend that invoked it.
pub trait Host {
    /// Invokes a function value (closure or native) with positional arguments.
    fn call(&self, func: &Value, args: Vec<Value>) -> Result<Value, EvalError>;
}

/// A primitive receives already-evaluated arguments.
pub type PrimitiveFn = dyn Fn(&[Value], &dyn Host) -> Result<Value, EvalError>;

/// Name-keyed table of primitives, injected into a backend at construction.
#[derive(Clone, Default)]
pub struct Primitives {
    table: HashMap<String, Rc<PrimitiveFn>>,
}

impl Primitives {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard library.
    pub fn standard() -> Self {
        let mut prims = Self::new();
        base::register(&mut prims);
        math::register(&mut prims);
        text::register(&mut prims);
        seq::register(&mut prims);
        obj::register(&mut prims);
        prims
    }

    /// Registers (or overrides) a primitive.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        func: impl Fn(&[Value], &dyn Host) -> Result<Value, EvalError> + 'static,
    ) -> &mut Self {
        self.table.insert(name.into(), Rc::new(func));
        self
    }

    /// Makes `alias` resolve to the primitive currently registered as `target`.
    pub fn alias(&mut self, alias: &str, target: &str) -> &mut Self {
        if let Some(func) = self.table.get(target).cloned() {
            self.table.insert(alias.to_string(), func);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Rc<PrimitiveFn>> {
        self.table.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Adds every primitive of `other`, overriding same-named entries.
    pub fn extend(&mut self, other: Primitives) -> &mut Self {
        self.table.extend(other.table);
        self
    }
}

impl fmt::Debug for Primitives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitives")
            .field("count", &self.table.len())
            .finish()
    }
}

pub(crate) fn exact(name: &str, args: &[Value], n: usize, expected: &'static str) -> Result<(), EvalError> {
    if args.len() == n {
        Ok(())
    } else {
        Err(EvalError::arity(name, expected, args.len()))
    }
}

pub(crate) fn at_least(name: &str, args: &[Value], n: usize, expected: &'static str) -> Result<(), EvalError> {
    if args.len() >= n {
        Ok(())
    } else {
        Err(EvalError::arity(name, expected, args.len()))
    }
}

pub(crate) fn number(name: &str, value: &Value) -> Result<f64, EvalError> {
    value
        .as_number()
        .ok_or_else(|| expected_type(name, "number", value))
}

pub(crate) fn string<'a>(name: &str, value: &'a Value) -> Result<&'a str, EvalError> {
    match value {
        Value::Str(s) | Value::Symbol(s) => Ok(s),
        other => Err(expected_type(name, "string", other)),
    }
}

pub(crate) fn list<'a>(name: &str, value: &'a Value) -> Result<&'a [Value], EvalError> {
    match value {
        Value::List(items) => Ok(items),
        Value::Null => Ok(&[]),
        other => Err(expected_type(name, "list", other)),
    }
}

pub(crate) fn expected_type(name: &str, expected: &str, got: &Value) -> EvalError {
    EvalError::Type(format!(
        "{name} expected {expected}, got {}",
        got.type_name()
    ))
}

/// Optional integral argument, clamped at zero.
pub(crate) fn opt_index(name: &str, args: &[Value], i: usize) -> Result<Option<usize>, EvalError> {
    match args.get(i) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => Ok(Some(number(name, v)?.max(0.0) as usize)),
    }
}
