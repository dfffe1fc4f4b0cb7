//! The state object a program is bound to, and action dispatch.

use rhizome_sprig_eval::Evaluator;
use rhizome_sprig_eval::selfhost::compile_on_thread_with;
use rhizome_sprig_ir::{Env, Object, THIS, Value, validate, wire};
use rhizome_sprig_runtime_native::{CompiledProgram, compile_source};
use rhizome_sprig_syntax::{LOOP_PREFIX, compile_program, compile_script, is_program, tokenize};
use tracing::{debug, trace, warn};

use crate::{Lang, RuntimeError, SprigConfig, update};

/// A loaded program: either list-expressions evaluated into a state
/// environment, or a natively compiled program owning its state.
enum Program {
    Evaluated { evaluator: Evaluator, env: Env },
    Native(CompiledProgram),
}

impl Program {
    fn read(&self, name: &str) -> Option<Value> {
        match self {
            Program::Evaluated { env, .. } if name != THIS => env.lookup(name),
            Program::Evaluated { .. } => None,
            Program::Native(program) => program.get(name),
        }
    }

    fn write(&self, name: &str, value: Value) {
        match self {
            Program::Evaluated { env, .. } => env.define(name, value),
            Program::Native(program) => program.set(name, value),
        }
    }

    fn snapshot(&self) -> Object {
        match self {
            Program::Evaluated { env, .. } => env.snapshot(),
            Program::Native(program) => program.state(),
        }
    }

    /// Calls `func`, found under `name`, with `bindings` visible to it.
    fn call(
        &self,
        name: &str,
        func: &Value,
        args: Vec<Value>,
        bindings: &Object,
    ) -> Result<Value, RuntimeError> {
        match self {
            Program::Evaluated { evaluator, .. } => Ok(evaluator.apply_with(func, args, bindings)?),
            Program::Native(program) => Ok(program.call_with_context(name, args, bindings)?),
        }
    }

    fn evaluate(&self, source: &str, context: &Object) -> Result<Value, RuntimeError> {
        match self {
            Program::Evaluated { evaluator, env } => {
                let scope = env.child();
                for (name, value) in context {
                    scope.define(name.as_str(), value.clone());
                }
                Ok(evaluator.eval_string(source, &scope)?)
            }
            Program::Native(program) => Ok(program.evaluate(source, context)?),
        }
    }
}

/// A program bound to a state object.
///
/// State is plain data: functions and generated loop names are never part
/// of [`Surface::state`]. Loading new code keeps existing state values the
/// new program does not define.
pub struct Surface {
    config: SprigConfig,
    lang: Lang,
    program: Program,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(SprigConfig::default())
    }
}

impl Surface {
    /// An empty surface. Until code is loaded, [`Surface::evaluate`] runs
    /// against an empty state.
    pub fn new(config: SprigConfig) -> Self {
        let program = Program::Evaluated {
            evaluator: Evaluator::new(config.eval.clone()),
            env: Env::new_state(),
        };
        Self {
            lang: config.runtime.default_lang,
            config,
            program,
        }
    }

    pub fn config(&self) -> &SprigConfig {
        &self.config
    }

    /// Language of the loaded program.
    pub fn lang(&self) -> Lang {
        self.lang
    }

    /// Loads `source` in the configured default language.
    pub fn load(&mut self, source: &str) -> Result<(), RuntimeError> {
        self.load_code(source, self.config.runtime.default_lang)
    }

    /// Compiles and runs `source`, replacing the loaded program. Top-level
    /// definitions are written into the state.
    pub fn load_code(&mut self, source: &str, lang: Lang) -> Result<(), RuntimeError> {
        let program = match lang {
            Lang::Surface => {
                let tokens = tokenize(source).map_err(rhizome_sprig_syntax::SyntaxError::from)?;
                let expr = if is_program(&tokens) {
                    compile_program(source, &self.config.parse)?
                } else {
                    compile_script(source, &self.config.parse)?
                };
                self.evaluated(&expr)?
            }
            Lang::Sexpr => {
                let expr = wire::from_str(source)?;
                validate(&expr)?;
                self.evaluated(&expr)?
            }
            Lang::SelfHosted => {
                let expr = compile_on_thread_with(source, self.config.runtime.bootstrap_limits())?;
                self.evaluated(&expr)?
            }
            Lang::Native => Program::Native(compile_source(source, &self.config.native)?),
        };

        let defined = program.snapshot();
        for (name, value) in self.state() {
            if !defined.contains_key(&name) {
                program.write(&name, value);
            }
        }
        debug!(%lang, definitions = defined.len(), "loaded program");
        self.program = program;
        self.lang = lang;
        Ok(())
    }

    fn evaluated(&self, expr: &Value) -> Result<Program, RuntimeError> {
        let evaluator = Evaluator::new(self.config.eval.clone());
        let env = Env::new_state();
        evaluator.evaluate(expr, &env)?;
        Ok(Program::Evaluated { evaluator, env })
    }

    /// Dispatches `name`.
    ///
    /// The handler is the first function found under `action:<name>`,
    /// `action_<name>` or `<name>`. It receives `context.args` as its
    /// arguments when that is a list, or the whole context otherwise; the
    /// context keys and `context` itself are readable as names. A returned
    /// update description is applied to the state, after which the derived
    /// action runs if the program defines one.
    ///
    /// A missing handler is not an error. The reserved set-state action
    /// applies the context directly: its `updates` entry if there is one,
    /// otherwise the context object itself.
    pub fn handle_action(&mut self, name: &str, context: &Object) -> Result<(), RuntimeError> {
        if name == self.config.runtime.set_state_action {
            let update = context
                .get("updates")
                .cloned()
                .unwrap_or_else(|| Value::Object(context.clone()));
            return self.apply_update(&update);
        }

        let derived = self.config.runtime.derived_action.clone();
        if !self.dispatch(name, context)? {
            if name == derived {
                debug!(action = name, "no derived-value handler");
            } else {
                warn!(action = name, "no handler for action");
            }
            return Ok(());
        }
        if name != derived && !self.dispatch(&derived, &Object::new())? {
            trace!(action = %derived, "no derived-value handler");
        }
        Ok(())
    }

    fn dispatch(&mut self, name: &str, context: &Object) -> Result<bool, RuntimeError> {
        let Some((handler, func)) = self.find_action(name) else {
            return Ok(false);
        };
        let args = match context.get("args") {
            Some(Value::List(items)) => items.clone(),
            _ => vec![Value::Object(context.clone())],
        };
        let mut bindings = context.clone();
        bindings.insert("context".into(), Value::Object(context.clone()));

        debug!(action = name, %handler, "dispatching action");
        let result = self.program.call(&handler, &func, args, &bindings)?;
        match update::parse(&result) {
            Some(writes) => self.write_all(writes)?,
            None => trace!(%handler, result = %result, "action result is not an update"),
        }
        Ok(true)
    }

    fn find_action(&self, name: &str) -> Option<(String, Value)> {
        [
            format!("action:{name}"),
            format!("action_{name}"),
            name.to_string(),
        ]
        .into_iter()
        .find_map(|candidate| {
            let func = self.program.read(&candidate).filter(Value::is_callable)?;
            Some((candidate, func))
        })
    }

    /// Applies an update description: an object of path/value entries or a
    /// list of `[path, value]` pairs.
    pub fn apply_update(&mut self, update: &Value) -> Result<(), RuntimeError> {
        let writes =
            update::parse(update).ok_or(RuntimeError::InvalidUpdate(update.type_name()))?;
        self.write_all(writes)
    }

    fn write_all(&mut self, writes: Vec<(String, Value)>) -> Result<(), RuntimeError> {
        for (path, value) in writes {
            self.set_state(&path, value)?;
        }
        Ok(())
    }

    /// Writes `value` at a `/`-separated path.
    pub fn set_state(&mut self, path: &str, value: Value) -> Result<(), RuntimeError> {
        let segments = update::segments(path)?;
        let (top, rest) = (segments[0], &segments[1..]);
        let current = self.program.read(top).unwrap_or(Value::Null);
        let updated = update::set_in(&current, rest, value)?;
        trace!(path, "state write");
        self.program.write(top, updated);
        Ok(())
    }

    /// Reads the value at a `/`-separated path.
    pub fn get_state(&self, path: &str) -> Result<Value, RuntimeError> {
        let segments = update::segments(path)?;
        let current = self.program.read(segments[0]).unwrap_or(Value::Null);
        Ok(update::get_in(&current, &segments[1..]))
    }

    /// Plain data in the state: functions and generated loop names are
    /// left out.
    pub fn state(&self) -> Object {
        self.program
            .snapshot()
            .into_iter()
            .filter(|(name, value)| !value.is_callable() && !name.starts_with(LOOP_PREFIX))
            .collect()
    }

    pub fn state_json(&self) -> serde_json::Value {
        Value::Object(self.state()).to_json()
    }

    /// Names of the functions the loaded program defines.
    pub fn actions(&self) -> Vec<String> {
        self.program
            .snapshot()
            .into_iter()
            .filter(|(name, value)| value.is_callable() && !name.starts_with(LOOP_PREFIX))
            .map(|(name, _)| name)
            .collect()
    }

    /// Runs a statement list against the state. Context keys are readable
    /// as names; assignments to state properties persist, new names do not.
    pub fn evaluate(&mut self, source: &str, context: &Object) -> Result<Value, RuntimeError> {
        self.program.evaluate(source, context)
    }
}
