//! List helpers and higher-order primitives.

use super::text::bounds;
use super::{MAX_SEQUENCE_LEN, at_least, exact, expected_type, higher, list, number, opt_index};
use crate::{EvalError, Primitives, Value, ops};

pub(super) fn register(prims: &mut Primitives) {
    prims.register("list", |args, _| Ok(Value::List(args.to_vec())));
    prims.register("push", |args, _| {
        at_least("push", args, 1, "at least 1")?;
        let mut items = list("push", &args[0])?.to_vec();
        items.extend_from_slice(&args[1..]);
        Ok(Value::List(items))
    });
    prims.register("concat", |args, _| {
        let mut items = Vec::new();
        for arg in args {
            match arg {
                Value::List(more) => items.extend_from_slice(more),
                other => items.push(other.clone()),
            }
        }
        Ok(Value::List(items))
    });
    prims.register("slice", |args, _| {
        at_least("slice", args, 1, "1 to 3")?;
        let start = opt_index("slice", args, 1)?.unwrap_or(0);
        match &args[0] {
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let end = opt_index("slice", args, 2)?.unwrap_or(chars.len());
                let (start, end) = bounds(start, end.max(start), chars.len());
                Ok(Value::Str(chars[start..end].iter().collect()))
            }
            other => {
                let items = list("slice", other)?;
                let end = opt_index("slice", args, 2)?.unwrap_or(items.len());
                let (start, end) = bounds(start, end.max(start), items.len());
                Ok(Value::List(items[start..end].to_vec()))
            }
        }
    });
    prims.register("reverse", |args, _| {
        exact("reverse", args, 1, "1")?;
        match &args[0] {
            Value::Str(s) => Ok(Value::Str(s.chars().rev().collect())),
            other => Ok(Value::List(list("reverse", other)?.iter().rev().cloned().collect())),
        }
    });
    prims.register("range", |args, _| {
        let (start, end, step) = match args {
            [end] => (0.0, number("range", end)?, 1.0),
            [start, end] => (number("range", start)?, number("range", end)?, 1.0),
            [start, end, step] => (
                number("range", start)?,
                number("range", end)?,
                number("range", step)?,
            ),
            _ => return Err(EvalError::arity("range", "1 to 3", args.len())),
        };
        if !(start.is_finite() && end.is_finite() && step.is_finite()) {
            return Err(EvalError::Type("range arguments must be finite".into()));
        }
        if step == 0.0 {
            return Err(EvalError::Type("range step must be non-zero".into()));
        }
        if start + step == start {
            return Err(EvalError::Type(format!("range step {step} is too small at {start}")));
        }
        let count = ((end - start) / step).ceil().max(0.0);
        if count > MAX_SEQUENCE_LEN as f64 {
            return Err(EvalError::Type(format!(
                "range would exceed {MAX_SEQUENCE_LEN} elements"
            )));
        }
        let items = (0..count as usize)
            .map(|k| Value::Number(start + k as f64 * step))
            .collect();
        Ok(Value::List(items))
    });
    prims.register("first", |args, _| {
        exact("first", args, 1, "1")?;
        Ok(list("first", &args[0])?.first().cloned().unwrap_or_default())
    });
    prims.register("last", |args, _| {
        exact("last", args, 1, "1")?;
        Ok(list("last", &args[0])?.last().cloned().unwrap_or_default())
    });
    prims.register("rest", |args, _| {
        exact("rest", args, 1, "1")?;
        let items = list("rest", &args[0])?;
        Ok(Value::List(items.iter().skip(1).cloned().collect()))
    });
    prims.register("nth", |args, _| {
        exact("nth", args, 2, "2")?;
        Ok(ops::get(&args[0], &args[1]))
    });
    prims.register("isEmpty", |args, _| {
        exact("isEmpty", args, 1, "1")?;
        Ok(Value::Bool(match &args[0] {
            Value::Null => true,
            Value::Str(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }))
    });

    for name in ["map", "filter", "find", "findIndex", "count", "sortBy"] {
        prims.register(name, move |args, host| {
            let (items, f) = collection(name, args)?;
            higher::apply(name, items, f, host)
        });
    }
    prims.register("reduce", |args, host| {
        exact("reduce", args, 3, "3")?;
        higher::reduce(list("reduce", &args[0])?, &args[1], args[2].clone(), host)
    });

    prims
        .alias("find-index", "findIndex")
        .alias("sort-by", "sortBy")
        .alias("fold", "reduce");
}

fn collection<'a>(name: &str, args: &'a [Value]) -> Result<(&'a [Value], &'a Value), EvalError> {
    exact(name, args, 2, "2")?;
    if !args[1].is_callable() {
        return Err(expected_type(name, "function", &args[1]));
    }
    Ok((list(name, &args[0])?, &args[1]))
}
