//! Numeric helpers.

use super::{at_least, exact, number};
use crate::{Primitives, Value};

pub(super) fn register(prims: &mut Primitives) {
    for (name, f) in [
        ("abs", f64::abs as fn(f64) -> f64),
        ("floor", f64::floor),
        ("ceil", f64::ceil),
        ("sqrt", f64::sqrt),
        ("trunc", f64::trunc),
    ] {
        prims.register(name, move |args, _| {
            exact(name, args, 1, "1")?;
            Ok(Value::Number(f(number(name, &args[0])?)))
        });
    }
    // Halves round toward positive infinity.
    prims.register("round", |args, _| {
        exact("round", args, 1, "1")?;
        Ok(Value::Number((number("round", &args[0])? + 0.5).floor()))
    });
    prims.register("pow", |args, _| {
        exact("pow", args, 2, "2")?;
        Ok(Value::Number(
            number("pow", &args[0])?.powf(number("pow", &args[1])?),
        ))
    });
    prims.register("min", |args, _| extremum("min", args, f64::min));
    prims.register("max", |args, _| extremum("max", args, f64::max));
}

fn extremum(
    name: &str,
    args: &[Value],
    pick: fn(f64, f64) -> f64,
) -> Result<Value, crate::EvalError> {
    at_least(name, args, 1, "at least 1")?;
    let mut acc = number(name, &args[0])?;
    for arg in &args[1..] {
        acc = pick(acc, number(name, arg)?);
    }
    Ok(Value::Number(acc))
}
