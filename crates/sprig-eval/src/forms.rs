//! Special forms and higher-order forms.
//!
//! Special forms receive their arguments unevaluated and cannot be shadowed.
//! Higher-order forms (`map`, `filter`, ...) accept either a function value
//! or an implicit expression over `item` and `index` (plus `acc` for
//! `reduce`).

use crate::evaluator::{EvalHost, Evaluator};
use rhizome_sprig_ir::stdlib::higher;
use rhizome_sprig_ir::{Closure, Env, EvalError, NativeFn, THIS, Value, ops};
use std::rc::Rc;

const ITEM_NAMES: &[&str] = &["item", "index"];
const REDUCE_NAMES: &[&str] = &["acc", "item", "index"];

impl Evaluator {
    /// Returns `None` when `name` is not a special form.
    pub(crate) fn special_form(
        &self,
        name: &str,
        args: &[Value],
        env: &Env,
        depth: usize,
    ) -> Option<Result<Value, EvalError>> {
        let result = match name {
            "quote" => match args {
                [data] => Ok(quote_data(data)),
                _ => Err(EvalError::arity(name, "1", args.len())),
            },
            "if" => self.eval_if(args, env, depth),
            "let" => self.eval_let(args, env, depth),
            "cond" => self.eval_cond(args, env, depth),
            "begin" | "progn" | "do" => self.eval_sequence(args, env, depth),
            "lambda" | "fn" => match args.split_first() {
                Some((params, body)) => make_closure(name, params, body, env),
                None => Err(EvalError::arity(name, "at least 2", 0)),
            },
            "define" | "defun" => self.eval_define(name, args, env, depth),
            "apply" => self.eval_apply(args, env, depth),
            "set-this" => self.eval_set_this(args, env, depth),
            "and" => self.eval_logical(args, env, depth, false),
            "or" => self.eval_logical(args, env, depth, true),
            _ => return None,
        };
        Some(result)
    }

    fn eval_if(&self, args: &[Value], env: &Env, depth: usize) -> Result<Value, EvalError> {
        let (test, consequent, alternate) = match args {
            [test, consequent] => (test, consequent, None),
            [test, consequent, alternate] => (test, consequent, Some(alternate)),
            _ => return Err(EvalError::arity("if", "2 or 3", args.len())),
        };
        if ops::truthy(&self.eval(test, env, depth + 1)?) {
            self.eval(consequent, env, depth + 1)
        } else if let Some(alternate) = alternate {
            self.eval(alternate, env, depth + 1)
        } else {
            Ok(Value::Null)
        }
    }

    /// Bindings are evaluated in order, each seeing the previous ones.
    fn eval_let(&self, args: &[Value], env: &Env, depth: usize) -> Result<Value, EvalError> {
        let Some((bindings, body)) = args.split_first() else {
            return Err(EvalError::arity("let", "at least 2", 0));
        };
        let Some(bindings) = bindings.as_list() else {
            return Err(EvalError::malformed("let", "expected a binding list"));
        };
        let frame = env.child();
        for binding in bindings {
            match binding.as_list() {
                Some([Value::Symbol(name), value]) => {
                    let value = self.eval(value, &frame, depth + 1)?;
                    frame.define(name.as_str(), value);
                }
                _ => return Err(EvalError::malformed("let", "expected (name value) binding")),
            }
        }
        self.eval_sequence(body, &frame, depth)
    }

    /// `(cond (test expr...) ... (else expr...))`. A clause with no body
    /// yields its test value.
    fn eval_cond(&self, args: &[Value], env: &Env, depth: usize) -> Result<Value, EvalError> {
        for clause in args {
            let Some((test, body)) = clause.as_list().and_then(<[Value]>::split_first) else {
                return Err(EvalError::malformed("cond", "expected a clause list"));
            };
            let value = match test {
                Value::Symbol(s) if s == "else" => Value::Bool(true),
                test => self.eval(test, env, depth + 1)?,
            };
            if ops::truthy(&value) {
                return if body.is_empty() {
                    Ok(value)
                } else {
                    self.eval_sequence(body, env, depth)
                };
            }
        }
        Ok(Value::Null)
    }

    pub(crate) fn eval_sequence(
        &self,
        body: &[Value],
        env: &Env,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let mut result = Value::Null;
        for expr in body {
            result = self.eval(expr, env, depth + 1)?;
        }
        Ok(result)
    }

    /// `(define name value)`, `(define (name params...) body...)` and
    /// `(defun name (params...) body...)`. Assignment goes through
    /// [`Env::set`], so an existing binding anywhere in the chain is mutated.
    fn eval_define(
        &self,
        form: &str,
        args: &[Value],
        env: &Env,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let (name, value) = match args {
            [Value::Symbol(name), params @ Value::List(_), body @ ..]
                if form == "defun" && !body.is_empty() =>
            {
                (name, make_closure(form, params, body, env)?)
            }
            [Value::Symbol(name), value] => (name, self.eval(value, env, depth + 1)?),
            [Value::List(signature), body @ ..] if !body.is_empty() => {
                let Some((Value::Symbol(name), params)) = signature.split_first() else {
                    return Err(EvalError::malformed(form, "expected (name params...)"));
                };
                let params = Value::List(params.to_vec());
                (name, make_closure(form, &params, body, env)?)
            }
            [_, _, ..] => return Err(EvalError::malformed(form, "expected a name")),
            _ => return Err(EvalError::arity(form, "2", args.len())),
        };
        env.set(name, value.clone())?;
        Ok(value)
    }

    /// `(set-this key value)`: evaluates the key, then the value, and writes
    /// only that property of `this`. Yields the updated `this`.
    fn eval_set_this(&self, args: &[Value], env: &Env, depth: usize) -> Result<Value, EvalError> {
        let [key, value] = args else {
            return Err(EvalError::arity("set-this", "2", args.len()));
        };
        let key = ops::key_string(&self.eval(key, env, depth + 1)?)?;
        let value = self.eval(value, env, depth + 1)?;
        env.set_this_key(&key, value)?;
        Ok(env.lookup(THIS).unwrap_or(Value::Null))
    }

    fn eval_apply(&self, args: &[Value], env: &Env, depth: usize) -> Result<Value, EvalError> {
        let [func, list] = args else {
            return Err(EvalError::arity("apply", "2", args.len()));
        };
        let func = self.eval(func, env, depth + 1)?;
        let args = match self.eval(list, env, depth + 1)? {
            Value::List(items) => items,
            Value::Null => Vec::new(),
            other => {
                return Err(EvalError::Type(format!(
                    "apply expects an argument list, got {}",
                    other.type_name()
                )));
            }
        };
        self.call(&func, args, None, depth)
    }

    /// Short-circuiting `and` / `or` with a boolean result.
    fn eval_logical(
        &self,
        args: &[Value],
        env: &Env,
        depth: usize,
        stop_on: bool,
    ) -> Result<Value, EvalError> {
        for arg in args {
            if ops::truthy(&self.eval(arg, env, depth + 1)?) == stop_on {
                return Ok(Value::Bool(stop_on));
            }
        }
        Ok(Value::Bool(!stop_on))
    }

    pub(crate) fn higher_order(
        &self,
        kind: &'static str,
        name: &str,
        args: &[Value],
        env: &Env,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let reduce = kind == "reduce";
        let arity_ok = if reduce { args.len() == 3 } else { args.len() == 2 };
        if !arity_ok {
            let expected = if reduce { "3" } else { "2" };
            return Err(EvalError::arity(name, expected, args.len()));
        }

        let collection = self.eval(&args[0], env, depth + 1)?;
        let items = match &collection {
            Value::List(items) => items.as_slice(),
            Value::Null => &[],
            other => {
                return Err(EvalError::Type(format!(
                    "{name} expects a list, got {}",
                    other.type_name()
                )));
            }
        };
        let names = if reduce { REDUCE_NAMES } else { ITEM_NAMES };
        let func = self.callback(&args[1], names, env, depth)?;
        let host = EvalHost::new(self, depth);
        if reduce {
            let init = self.eval(&args[2], env, depth + 1)?;
            higher::reduce(items, &func, init, &host)
        } else {
            higher::apply(kind, items, &func, &host)
        }
    }

    /// A symbol bound to a function, a primitive name or a lambda form is
    /// used as-is. Anything else becomes an implicit function that evaluates
    /// the expression with `names` bound to the call arguments.
    fn callback(
        &self,
        expr: &Value,
        names: &'static [&'static str],
        env: &Env,
        depth: usize,
    ) -> Result<Value, EvalError> {
        match expr {
            Value::Symbol(name) => {
                if let Some(func) = env.lookup(name).filter(Value::is_callable) {
                    return Ok(func);
                }
                if !env.is_bound(name) {
                    if let Some(func) = self.primitive_value(name, depth) {
                        return Ok(func);
                    }
                }
            }
            Value::List(items) if matches!(items.first().and_then(Value::as_symbol), Some("lambda" | "fn")) => {
                return self.eval(expr, env, depth + 1);
            }
            _ => {}
        }

        let evaluator = self.clone();
        let env = env.clone();
        let body = expr.clone();
        Ok(Value::Native(NativeFn::new("implicit", move |args| {
            let frame = env.child();
            let mut args = args.into_iter();
            for name in names {
                frame.define(*name, args.next().unwrap_or_default());
            }
            evaluator.eval(&body, &frame, depth + 1)
        })))
    }
}

fn make_closure(form: &str, params: &Value, body: &[Value], env: &Env) -> Result<Value, EvalError> {
    let Some(params) = params.as_list() else {
        return Err(EvalError::malformed(form, "expected a parameter list"));
    };
    let params = params
        .iter()
        .map(|p| {
            p.as_symbol()
                .map(str::to_string)
                .ok_or_else(|| EvalError::malformed(form, format!("invalid parameter {p}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let body = match body {
        [] => return Err(EvalError::malformed(form, "missing body")),
        [single] => single.clone(),
        many => Value::call("progn", many.to_vec()),
    };
    Ok(Value::Closure(Rc::new(Closure {
        params,
        body,
        env: env.clone(),
    })))
}

/// Quoted symbols become strings, recursively.
fn quote_data(value: &Value) -> Value {
    match value {
        Value::Symbol(name) => Value::Str(name.clone()),
        Value::List(items) => Value::List(items.iter().map(quote_data).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), quote_data(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
