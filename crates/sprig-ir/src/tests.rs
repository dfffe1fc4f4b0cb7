//! Tests for sprig-ir.

use crate::stdlib::Host;
use crate::{EvalError, NativeFn, Primitives, Value, wire};
use serde_json::json;

/// Calls native function values directly; enough for the higher-order
/// primitives.
struct NativeHost;

impl Host for NativeHost {
    fn call(&self, func: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
        match func {
            Value::Native(f) => f.call(args),
            other => Err(EvalError::NotCallable(other.to_string())),
        }
    }
}

fn prim(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    let prims = Primitives::standard();
    let f = prims.get(name).unwrap();
    f(&args, &NativeHost)
}

fn native(f: impl Fn(Vec<Value>) -> Result<Value, EvalError> + 'static) -> Value {
    Value::Native(NativeFn::new("test", f))
}

#[test]
fn test_value_call() {
    let expr = Value::call("define", vec![Value::symbol("x"), Value::from(10)]);
    assert_eq!(expr.head(), Some("define"));
    assert_eq!(expr.as_list().unwrap().len(), 3);
    assert_eq!(Value::from(1).head(), None);
}

#[test]
fn test_value_accessors() {
    assert_eq!(Value::from(true).as_bool(), Some(true));
    assert_eq!(Value::from(3.5).as_number(), Some(3.5));
    assert_eq!(Value::from("test").as_str(), Some("test"));
    assert_eq!(Value::symbol("x").as_str(), None);
    assert_eq!(Value::symbol("x").as_symbol(), Some("x"));
    assert_eq!(Value::from(42.0).as_str(), None);
}

#[test]
fn test_display() {
    let expr = Value::call(
        "progn",
        vec![
            Value::call("define", vec![Value::symbol("s"), Value::quote("a\"b".into())]),
            Value::List(vec![Value::from(1.5), Value::Null, Value::from(true)]),
        ],
    );
    assert_eq!(expr.to_string(), r#"(progn (define s (quote "a\"b")) (1.5 null true))"#);
}

#[test]
fn test_json_conversion() {
    let json = json!({"display": "5", "items": [1, 2.5, null], "on": false});
    let value = Value::from_json(&json);
    assert_eq!(
        value.as_object().unwrap().get("display"),
        Some(&Value::from("5"))
    );
    assert_eq!(value.to_json(), json);
}

#[test]
fn test_functions_compare_by_identity() {
    let f = native(|_| Ok(Value::Null));
    let g = native(|_| Ok(Value::Null));
    assert_eq!(f, f.clone());
    assert_ne!(f, g);
    assert_eq!(f.to_json(), serde_json::Value::Null);
}

#[test]
fn test_serde_uses_wire_form() {
    let expr = Value::call("log", vec![Value::quote(Value::from("hi"))]);
    let text = serde_json::to_string(&expr).unwrap();
    assert_eq!(text, wire::to_string(&expr).unwrap());
    let back: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(back, expr);
}

#[test]
fn test_arithmetic_primitives() {
    assert_eq!(prim("+", vec![1.into(), 2.into(), 3.into()]).unwrap(), Value::from(6));
    assert_eq!(prim("+", vec!["a".into(), 1.into()]).unwrap(), Value::from("a1"));
    assert_eq!(prim("-", vec![5.into()]).unwrap(), Value::from(-5));
    assert_eq!(prim("/", vec![7.into(), 2.into()]).unwrap(), Value::from(3.5));
    assert_eq!(prim("%", vec![7.into(), 2.into()]).unwrap(), Value::from(1));
    assert!(matches!(
        prim("%", vec![7.into()]),
        Err(EvalError::Arity { .. })
    ));
}

#[test]
fn test_equality_primitives_are_strict() {
    assert_eq!(prim("==", vec![1.into(), "1".into()]).unwrap(), Value::Bool(false));
    assert_eq!(prim("!=", vec![1.into(), "1".into()]).unwrap(), Value::Bool(true));
    assert_eq!(prim("<", vec!["a".into(), "b".into()]).unwrap(), Value::Bool(true));
}

#[test]
fn test_conversions() {
    assert_eq!(prim("number", vec!["42".into()]).unwrap(), Value::from(42));
    assert_eq!(prim("string", vec![8.into()]).unwrap(), Value::from("8"));
    assert_eq!(prim("type", vec![Value::Null]).unwrap(), Value::from("null"));
    assert_eq!(prim("symbol", vec!["x".into()]).unwrap(), Value::symbol("x"));
    assert_eq!(
        prim("error", vec!["bad".into(), 1.into()]),
        Err(EvalError::Raised("bad 1".into()))
    );
}

#[test]
fn test_list_primitives() {
    let items = Value::List(vec![1.into(), 2.into(), 3.into()]);
    assert_eq!(
        prim("push", vec![items.clone(), 4.into()]).unwrap(),
        Value::List(vec![1.into(), 2.into(), 3.into(), 4.into()])
    );
    assert_eq!(prim("rest", vec![items.clone()]).unwrap().as_list().unwrap().len(), 2);
    assert_eq!(prim("last", vec![items.clone()]).unwrap(), Value::from(3));
    assert_eq!(
        prim("slice", vec![items.clone(), 1.into()]).unwrap(),
        Value::List(vec![2.into(), 3.into()])
    );
    assert_eq!(
        prim("range", vec![3.into()]).unwrap(),
        Value::List(vec![0.into(), 1.into(), 2.into()])
    );
    assert_eq!(prim("first", vec![Value::List(vec![])]).unwrap(), Value::Null);
}

#[test]
fn test_range_is_bounded() {
    assert_eq!(
        prim("range", vec![1.into(), 2.into(), 0.25.into()]).unwrap(),
        Value::List(vec![1.into(), 1.25.into(), 1.5.into(), 1.75.into()])
    );
    assert_eq!(
        prim("range", vec![3.into(), 0.into(), (-1).into()]).unwrap(),
        Value::List(vec![3.into(), 2.into(), 1.into()])
    );
    assert_eq!(prim("range", vec![3.into(), 0.into()]).unwrap(), Value::List(vec![]));

    let rejected: Vec<Vec<Value>> = vec![
        vec![f64::INFINITY.into()],
        vec![f64::NAN.into()],
        vec![0.into(), 1.into(), 0.into()],
        vec![0.into(), f64::NEG_INFINITY.into(), (-1).into()],
        // Past 2^53 a unit step no longer changes the value.
        vec![9007199254740992.0.into(), 9007199254741000.0.into()],
        vec![1e12.into()],
        vec![0.into(), ((crate::stdlib::MAX_SEQUENCE_LEN + 1) as f64).into()],
    ];
    for args in rejected {
        assert!(
            matches!(prim("range", args.clone()), Err(EvalError::Type(_))),
            "range{args:?}"
        );
    }
}

#[test]
fn test_higher_order_primitives() {
    let items = Value::List(vec![3.into(), 1.into(), 2.into()]);
    let double = native(|args| crate::ops::mul(&args[0], &Value::from(2)));
    assert_eq!(
        prim("map", vec![items.clone(), double]).unwrap(),
        Value::List(vec![6.into(), 2.into(), 4.into()])
    );

    let big = native(|args| crate::ops::gt(&args[0], &Value::from(1)).map(Value::Bool));
    assert_eq!(prim("count", vec![items.clone(), big.clone()]).unwrap(), Value::from(2));
    assert_eq!(prim("find", vec![items.clone(), big.clone()]).unwrap(), Value::from(3));
    assert_eq!(prim("find-index", vec![items.clone(), big]).unwrap(), Value::from(0));

    let identity = native(|args| Ok(args[0].clone()));
    assert_eq!(
        prim("sort-by", vec![items.clone(), identity]).unwrap(),
        Value::List(vec![1.into(), 2.into(), 3.into()])
    );

    let sum = native(|args| crate::ops::add(&args[0], &args[1]));
    assert_eq!(prim("fold", vec![items, sum, 0.into()]).unwrap(), Value::from(6));
}

#[test]
fn test_higher_order_requires_function() {
    let err = prim("map", vec![Value::List(vec![]), 1.into()]).unwrap_err();
    assert!(matches!(err, EvalError::Type(_)));
}

#[test]
fn test_object_primitives() {
    let obj = prim("object", vec!["a".into(), 1.into(), "b".into(), 2.into()]).unwrap();
    assert_eq!(prim("get", vec![obj.clone(), "b".into()]).unwrap(), Value::from(2));
    assert_eq!(
        prim("keys", vec![obj.clone()]).unwrap(),
        Value::List(vec!["a".into(), "b".into()])
    );
    let updated = prim("set", vec![obj.clone(), "c".into(), 3.into()]).unwrap();
    assert_eq!(prim("has", vec![updated, "c".into()]).unwrap(), Value::Bool(true));
    assert_eq!(prim("has", vec![obj, "c".into()]).unwrap(), Value::Bool(false));
}

#[test]
fn test_registry_override_and_alias() {
    let mut prims = Primitives::standard();
    prims.register("shout", |args, _| {
        Ok(Value::Str(format!("{}!", crate::ops::to_display(&args[0]))))
    });
    prims.alias("yell", "shout");
    assert!(prims.contains("yell"));
    let f = prims.get("yell").unwrap();
    assert_eq!(f(&[Value::from("hi")], &NativeHost).unwrap(), Value::from("hi!"));
    assert!(prims.names().contains(&"map"));
}
