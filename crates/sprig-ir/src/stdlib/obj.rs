//! Object helpers. Objects are values: `set` and `merge` return copies.

use super::{exact, expected_type};
use std::borrow::Cow;
use crate::{EvalError, Object, Primitives, Value, ops};

pub(super) fn register(prims: &mut Primitives) {
    prims.register("object", |args, _| {
        if args.len() % 2 != 0 {
            return Err(EvalError::arity("object", "an even number", args.len()));
        }
        let mut map = Object::new();
        for pair in args.chunks(2) {
            map.insert(ops::key_string(&pair[0])?, pair[1].clone());
        }
        Ok(Value::Object(map))
    });
    prims.register("get", |args, _| {
        exact("get", args, 2, "2")?;
        Ok(ops::get(&args[0], &args[1]))
    });
    prims.register("set", |args, _| {
        exact("set", args, 3, "3")?;
        ops::set(&args[0], &args[1], args[2].clone())
    });
    prims.register("keys", |args, _| {
        exact("keys", args, 1, "1")?;
        Ok(Value::List(
            object("keys", &args[0])?.keys().map(|k| Value::from(k.as_str())).collect(),
        ))
    });
    prims.register("values", |args, _| {
        exact("values", args, 1, "1")?;
        Ok(Value::List(object("values", &args[0])?.values().cloned().collect()))
    });
    prims.register("has", |args, _| {
        exact("has", args, 2, "2")?;
        let key = ops::key_string(&args[1])?;
        Ok(Value::Bool(object("has", &args[0])?.contains_key(&key)))
    });
    prims.register("merge", |args, _| {
        let mut map = Object::new();
        for arg in args {
            map.extend(object("merge", arg)?.into_owned());
        }
        Ok(Value::Object(map))
    });
}

/// Null reads as the empty object.
fn object<'a>(name: &str, value: &'a Value) -> Result<Cow<'a, Object>, EvalError> {
    match value {
        Value::Object(map) => Ok(Cow::Borrowed(map)),
        Value::Null => Ok(Cow::Owned(Object::new())),
        other => Err(expected_type(name, "object", other)),
    }
}
