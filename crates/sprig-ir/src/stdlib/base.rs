//! Operators, conversions and type predicates.

use super::{at_least, exact, string};
use crate::{EvalError, Primitives, Value, ops};

pub(super) fn register(prims: &mut Primitives) {
    prims.register("+", |args, _| {
        let Some((first, rest)) = args.split_first() else {
            return Ok(Value::from(0));
        };
        rest.iter().try_fold(first.clone(), |acc, v| ops::add(&acc, v))
    });
    prims.register("-", |args, _| match args {
        [] => Err(EvalError::arity("-", "at least 1", 0)),
        [only] => ops::neg(only),
        [first, rest @ ..] => rest.iter().try_fold(first.clone(), |acc, v| ops::sub(&acc, v)),
    });
    prims.register("*", |args, _| {
        args.iter().try_fold(Value::from(1), |acc, v| ops::mul(&acc, v))
    });
    prims.register("/", |args, _| {
        at_least("/", args, 2, "at least 2")?;
        args[1..].iter().try_fold(args[0].clone(), |acc, v| ops::div(&acc, v))
    });
    prims.register("%", |args, _| {
        exact("%", args, 2, "2")?;
        ops::rem(&args[0], &args[1])
    });

    prims.register("==", |args, _| {
        exact("==", args, 2, "2")?;
        Ok(Value::Bool(ops::strict_eq(&args[0], &args[1])))
    });
    prims.register("!=", |args, _| {
        exact("!=", args, 2, "2")?;
        Ok(Value::Bool(!ops::strict_eq(&args[0], &args[1])))
    });
    prims.register("<", |args, _| relational("<", args, ops::lt));
    prims.register("<=", |args, _| relational("<=", args, ops::le));
    prims.register(">", |args, _| relational(">", args, ops::gt));
    prims.register(">=", |args, _| relational(">=", args, ops::ge));
    prims.register("not", |args, _| {
        exact("not", args, 1, "1")?;
        Ok(Value::Bool(!ops::truthy(&args[0])))
    });

    prims.register("string", |args, _| {
        exact("string", args, 1, "1")?;
        Ok(Value::Str(ops::to_display(&args[0])))
    });
    prims.register("str", |args, _| {
        Ok(Value::Str(args.iter().map(ops::to_display).collect()))
    });
    prims.register("number", |args, _| {
        exact("number", args, 1, "1")?;
        Ok(Value::Number(match &args[0] {
            Value::Number(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Null => 0.0,
            Value::Str(s) if s.trim().is_empty() => 0.0,
            Value::Str(s) => s.trim().parse().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }))
    });
    prims.register("boolean", |args, _| {
        exact("boolean", args, 1, "1")?;
        Ok(Value::Bool(ops::truthy(&args[0])))
    });
    prims.register("type", |args, _| {
        exact("type", args, 1, "1")?;
        Ok(Value::from(args[0].type_name()))
    });
    prims.register("symbol", |args, _| {
        exact("symbol", args, 1, "1")?;
        Ok(Value::Symbol(string("symbol", &args[0])?.to_string()))
    });

    for (name, kind) in [
        ("isNull", "null"),
        ("isBool", "boolean"),
        ("isNumber", "number"),
        ("isString", "string"),
        ("isSymbol", "symbol"),
        ("isList", "list"),
        ("isObject", "object"),
        ("isFunction", "function"),
    ] {
        prims.register(name, move |args, _| {
            exact(name, args, 1, "1")?;
            Ok(Value::Bool(args[0].type_name() == kind))
        });
    }

    prims.register("error", |args, _| {
        let message: Vec<String> = args.iter().map(ops::to_display).collect();
        Err(EvalError::Raised(message.join(" ")))
    });
    prims.register("log", |args, _| {
        let message: Vec<String> = args.iter().map(ops::to_display).collect();
        tracing::info!(target: "sprig::log", "{}", message.join(" "));
        Ok(Value::Null)
    });
}

fn relational(
    name: &str,
    args: &[Value],
    op: fn(&Value, &Value) -> Result<bool, EvalError>,
) -> Result<Value, EvalError> {
    exact(name, args, 2, "2")?;
    Ok(Value::Bool(op(&args[0], &args[1])?))
}
