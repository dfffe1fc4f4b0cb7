//! Core evaluation loop and call dispatch.

use rhizome_sprig_ir::stdlib::higher;
use rhizome_sprig_ir::{Env, EvalError, Host, NativeFn, Object, Primitives, Value};
use rhizome_sprig_syntax::{ParseOptions, compile_script};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Default nesting limit for [`EvalConfig::max_depth`].
pub const DEFAULT_MAX_DEPTH: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Maximum evaluation nesting. Every nested evaluation, including each
    /// closure call and each loop iteration, counts.
    pub max_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Tree-walking evaluator.
///
/// Cloning is cheap; clones share the primitive registry.
#[derive(Clone)]
pub struct Evaluator {
    config: EvalConfig,
    primitives: Rc<Primitives>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(EvalConfig::default())
    }
}

impl Evaluator {
    /// An evaluator over the standard primitive library.
    pub fn new(config: EvalConfig) -> Self {
        Self::with_primitives(config, Primitives::standard())
    }

    pub fn with_primitives(config: EvalConfig, primitives: Primitives) -> Self {
        Self {
            config,
            primitives: Rc::new(primitives),
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn primitives(&self) -> &Primitives {
        &self.primitives
    }

    /// Evaluates `expr` in `env`.
    pub fn evaluate(&self, expr: &Value, env: &Env) -> Result<Value, EvalError> {
        self.eval(expr, env, 0)
    }

    /// Compiles `source` as a statement list and evaluates it in `env`.
    pub fn eval_string(&self, source: &str, env: &Env) -> Result<Value, crate::Error> {
        let expr = compile_script(source, &ParseOptions::default())?;
        Ok(self.evaluate(&expr, env)?)
    }

    /// Calls a function value with positional arguments.
    pub fn apply(&self, func: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
        self.call(func, args, None, 0)
    }

    /// Like [`Evaluator::apply`], but `bindings` are defined in the call
    /// frame before the parameters, so parameters shadow them.
    pub fn apply_with(
        &self,
        func: &Value,
        args: Vec<Value>,
        bindings: &Object,
    ) -> Result<Value, EvalError> {
        self.call(func, args, Some(bindings), 0)
    }

    pub(crate) fn eval(&self, expr: &Value, env: &Env, depth: usize) -> Result<Value, EvalError> {
        if depth >= self.config.max_depth {
            return Err(EvalError::MaxDepth(self.config.max_depth));
        }
        match expr {
            Value::Symbol(name) => self.resolve(name, env, depth),
            Value::List(items) => match items.split_first() {
                None => Ok(Value::List(Vec::new())),
                Some((head, args)) => self.eval_list(head, args, env, depth),
            },
            other => Ok(other.clone()),
        }
    }

    pub(crate) fn eval_args(
        &self,
        args: &[Value],
        env: &Env,
        depth: usize,
    ) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.eval(arg, env, depth + 1)).collect()
    }

    /// Variables first, then primitives as first-class function values.
    fn resolve(&self, name: &str, env: &Env, depth: usize) -> Result<Value, EvalError> {
        if let Some(value) = env.lookup(name) {
            return Ok(value);
        }
        self.primitive_value(name, depth)
            .ok_or_else(|| EvalError::UnboundVariable(name.to_string()))
    }

    /// Wraps a primitive as a callable value. Callbacks it makes run at the
    /// depth where it was referenced.
    pub(crate) fn primitive_value(&self, name: &str, depth: usize) -> Option<Value> {
        let prim = self.primitives.get(name)?;
        let evaluator = self.clone();
        Some(Value::Native(NativeFn::new(name, move |args| {
            prim(&args, &EvalHost::new(&evaluator, depth))
        })))
    }

    fn eval_list(
        &self,
        head: &Value,
        args: &[Value],
        env: &Env,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let Value::Symbol(name) = head else {
            let func = self.eval(head, env, depth + 1)?;
            let args = self.eval_args(args, env, depth)?;
            return self.call(&func, args, None, depth);
        };

        if let Some(result) = self.special_form(name, args, env, depth) {
            return result;
        }

        let bound = env.lookup(name);
        let bound_callable = bound.as_ref().is_some_and(Value::is_callable);
        // Higher-order forms step aside for user functions of the same name.
        if !bound_callable {
            if let Some(kind) = higher::canonical(name) {
                return self.higher_order(kind, name, args, env, depth);
            }
        }

        match bound {
            Some(func) if bound_callable => {
                let args = self.eval_args(args, env, depth)?;
                self.call(&func, args, None, depth)
            }
            bound => match self.primitives.get(name) {
                Some(prim) => {
                    let args = self.eval_args(args, env, depth)?;
                    prim(&args, &EvalHost::new(self, depth))
                }
                None if bound.is_some() => Err(EvalError::NotCallable(name.to_string())),
                None => Err(EvalError::UnknownFunction(name.to_string())),
            },
        }
    }

    /// Invokes a closure or native function. Missing arguments bind to null
    /// and extra arguments are ignored.
    pub(crate) fn call(
        &self,
        func: &Value,
        args: Vec<Value>,
        bindings: Option<&Object>,
        depth: usize,
    ) -> Result<Value, EvalError> {
        match func {
            Value::Closure(closure) => {
                let frame = closure.env.child();
                if let Some(bindings) = bindings {
                    for (name, value) in bindings {
                        frame.define(name.as_str(), value.clone());
                    }
                }
                let mut args = args.into_iter();
                for param in &closure.params {
                    frame.define(param.as_str(), args.next().unwrap_or_default());
                }
                self.eval(&closure.body, &frame, depth + 1)
            }
            Value::Native(native) => native.call(args),
            other => Err(EvalError::NotCallable(other.to_string())),
        }
    }
}

/// Lets primitives call back into the evaluator at the caller's depth.
pub(crate) struct EvalHost<'a> {
    evaluator: &'a Evaluator,
    depth: usize,
}

impl<'a> EvalHost<'a> {
    pub(crate) fn new(evaluator: &'a Evaluator, depth: usize) -> Self {
        Self { evaluator, depth }
    }
}

impl Host for EvalHost<'_> {
    fn call(&self, func: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
        self.evaluator.call(func, args, None, self.depth + 1)
    }
}
