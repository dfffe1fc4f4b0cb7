//! List-expression validation.

use crate::Value;
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("invalid argument count for {form}: expected {expected}, got {got}")]
    InvalidArgCount {
        form: String,
        expected: &'static str,
        got: usize,
    },

    #[error("invalid {what} in {form}")]
    InvalidShape { form: String, what: &'static str },

    #[error("{0} values cannot appear in code")]
    NotCode(&'static str),
}

/// Validate a list-expression for structural correctness.
///
/// This checks the shape of special forms (arity, parameter lists, binding
/// targets) and recursively validates nested expressions. It does NOT check
/// that called functions exist; that depends on the primitive registry and
/// the environment and is done at evaluation time.
pub fn validate(expr: &Value) -> Result<(), ValidationError> {
    match expr {
        Value::Closure(_) | Value::Native(_) => Err(ValidationError::NotCode("function")),
        Value::Object(map) => map.values().try_for_each(validate),
        Value::List(items) => {
            let Some(head) = items.first().and_then(Value::as_symbol) else {
                return items.iter().try_for_each(validate);
            };
            let args = &items[1..];
            match head {
                // Quoted data is never evaluated.
                "quote" => arity(head, args, "1", args.len() == 1),
                "if" => {
                    arity(head, args, "2 or 3", (2..=3).contains(&args.len()))?;
                    args.iter().try_for_each(validate)
                }
                "lambda" | "fn" => {
                    arity(head, args, "at least 2", args.len() >= 2)?;
                    params(head, &args[0])?;
                    args[1..].iter().try_for_each(validate)
                }
                "define" | "defun" => {
                    arity(head, args, "at least 2", args.len() >= 2)?;
                    match &args[0] {
                        Value::Symbol(_) if head == "defun" && args.len() >= 3 => {
                            params(head, &args[1])?;
                            args[2..].iter().try_for_each(validate)
                        }
                        Value::Symbol(_) => {
                            arity(head, args, "2", args.len() == 2)?;
                            validate(&args[1])
                        }
                        Value::List(sig) if !sig.is_empty() => {
                            let names = Value::List(sig.clone());
                            params(head, &names)?;
                            args[1..].iter().try_for_each(validate)
                        }
                        _ => shape(head, "binding target"),
                    }
                }
                "let" => {
                    arity(head, args, "at least 2", args.len() >= 2)?;
                    let Some(bindings) = args[0].as_list() else {
                        return shape(head, "binding list");
                    };
                    for binding in bindings {
                        match binding.as_list() {
                            Some([Value::Symbol(_), value]) => validate(value)?,
                            _ => return shape(head, "binding"),
                        }
                    }
                    args[1..].iter().try_for_each(validate)
                }
                "cond" => {
                    for clause in args {
                        match clause.as_list() {
                            Some(parts) if !parts.is_empty() => {
                                parts.iter().try_for_each(validate)?
                            }
                            _ => return shape(head, "clause"),
                        }
                    }
                    Ok(())
                }
                "apply" | "set-this" => {
                    arity(head, args, "2", args.len() == 2)?;
                    args.iter().try_for_each(validate)
                }
                _ => args.iter().try_for_each(validate),
            }
        }
        // All other types (null, bool, number, string, symbol) are valid
        _ => Ok(()),
    }
}

fn arity(
    form: &str,
    args: &[Value],
    expected: &'static str,
    ok: bool,
) -> Result<(), ValidationError> {
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidArgCount {
            form: form.to_string(),
            expected,
            got: args.len(),
        })
    }
}

fn shape(form: &str, what: &'static str) -> Result<(), ValidationError> {
    Err(ValidationError::InvalidShape {
        form: form.to_string(),
        what,
    })
}

fn params(form: &str, list: &Value) -> Result<(), ValidationError> {
    match list.as_list() {
        Some(names) if names.iter().all(|n| n.as_symbol().is_some()) => Ok(()),
        _ => shape(form, "parameter list"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Value {
        Value::symbol(s)
    }

    #[test]
    fn test_validate_literals() {
        assert!(validate(&Value::Null).is_ok());
        assert!(validate(&Value::from(true)).is_ok());
        assert!(validate(&Value::from(42.0)).is_ok());
        assert!(validate(&Value::from("hello")).is_ok());
        assert!(validate(&Value::List(vec![])).is_ok());
    }

    #[test]
    fn test_validate_nested() {
        let expr = Value::call(
            "progn",
            vec![
                Value::call("define", vec![sym("x"), Value::from(10)]),
                Value::call("+", vec![sym("x"), Value::from(5)]),
            ],
        );
        assert!(validate(&expr).is_ok());
    }

    #[test]
    fn test_validate_if_arity() {
        let expr = Value::call("if", vec![Value::from(true)]);
        assert_eq!(
            validate(&expr),
            Err(ValidationError::InvalidArgCount {
                form: "if".into(),
                expected: "2 or 3",
                got: 1,
            })
        );
    }

    #[test]
    fn test_validate_lambda_params() {
        let ok = Value::call("lambda", vec![Value::List(vec![sym("x")]), sym("x")]);
        assert!(validate(&ok).is_ok());

        let bad = Value::call("lambda", vec![Value::List(vec![Value::from(1)]), sym("x")]);
        assert!(matches!(
            validate(&bad),
            Err(ValidationError::InvalidShape { what: "parameter list", .. })
        ));
    }

    #[test]
    fn test_validate_define_sugar() {
        let expr = Value::call(
            "define",
            vec![
                Value::List(vec![sym("inc"), sym("n")]),
                Value::call("+", vec![sym("n"), Value::from(1)]),
            ],
        );
        assert!(validate(&expr).is_ok());
        let bad = Value::call("define", vec![Value::from(1), Value::from(2)]);
        assert!(validate(&bad).is_err());
    }

    #[test]
    fn test_validate_defun() {
        let expr = Value::call(
            "defun",
            vec![sym("inc"), Value::List(vec![sym("n")]), sym("n")],
        );
        assert!(validate(&expr).is_ok());
        let bad = Value::call("defun", vec![sym("inc"), Value::from(1), sym("n")]);
        assert!(matches!(
            validate(&bad),
            Err(ValidationError::InvalidShape { what: "parameter list", .. })
        ));
    }

    #[test]
    fn test_validate_let_bindings() {
        let expr = Value::call(
            "let",
            vec![
                Value::List(vec![Value::List(vec![sym("a"), Value::from(1)])]),
                sym("a"),
            ],
        );
        assert!(validate(&expr).is_ok());
        let bad = Value::call("let", vec![Value::List(vec![sym("a")]), sym("a")]);
        assert!(validate(&bad).is_err());
    }

    #[test]
    fn test_validate_cond_clauses() {
        // A clause may be a bare test, which yields its own value.
        let expr = Value::call(
            "cond",
            vec![
                Value::List(vec![sym("x")]),
                Value::List(vec![sym("else"), Value::from(1)]),
            ],
        );
        assert!(validate(&expr).is_ok());

        for bad in [Value::List(vec![]), Value::from(1)] {
            assert!(matches!(
                validate(&Value::call("cond", vec![bad])),
                Err(ValidationError::InvalidShape { what: "clause", .. })
            ));
        }
    }

    #[test]
    fn test_validate_set_this_arity() {
        let ok = Value::call("set-this", vec![Value::quote(sym("x")), Value::from(1)]);
        assert!(validate(&ok).is_ok());
        let bad = Value::call("set-this", vec![Value::quote(sym("x"))]);
        assert!(matches!(
            validate(&bad),
            Err(ValidationError::InvalidArgCount { expected: "2", got: 1, .. })
        ));
    }

    #[test]
    fn test_quoted_data_is_not_checked() {
        let expr = Value::quote(Value::call("if", vec![]));
        assert!(validate(&expr).is_ok());
    }
}
