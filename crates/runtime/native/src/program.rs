//! Compiled programs.

use rhizome_sprig_ir::{Object, Primitives, Value};
use rhizome_sprig_syntax::{ParseOptions, Parser, Program, SyntaxError, tokenize};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::codegen::Compiler;
use crate::machine::{Exec, Frame, Machine, call_value};
use crate::{NativeConfig, NativeError};

/// A program compiled to closures, together with its state object.
///
/// Top-level definitions are evaluated once, in order, when the program is
/// compiled. Methods are ordinary function values stored in the state.
pub struct CompiledProgram {
    machine: Rc<Machine>,
    definitions: Vec<String>,
    globals: HashSet<String>,
}

impl CompiledProgram {
    pub fn compile(
        program: &Program,
        config: &NativeConfig,
        primitives: Primitives,
    ) -> Result<Self, NativeError> {
        let primitives = Rc::new(primitives);
        let definitions: Vec<String> = program
            .definitions
            .iter()
            .map(|e| e.key().to_string())
            .collect();
        let globals: HashSet<String> = definitions.iter().cloned().collect();

        let mut compiler = Compiler::new(&primitives, &globals);
        let mut initializers = Vec::with_capacity(program.definitions.len());
        for entry in &program.definitions {
            initializers.push((entry.key(), compiler.entry(entry)?));
        }

        let machine = Machine::new(config.clone(), primitives.clone());
        let root = Frame::root();
        let exec = Exec {
            machine: &machine,
            frame: &root,
        };
        for (name, init) in &initializers {
            let value = init(&exec)?;
            machine.state_set(name, value);
        }
        tracing::debug!(definitions = definitions.len(), "compiled native program");

        Ok(Self {
            machine,
            definitions,
            globals,
        })
    }

    /// Top-level names in definition order.
    pub fn definitions(&self) -> &[String] {
        &self.definitions
    }

    /// Every property currently in the state, including ones added at run
    /// time.
    pub fn names(&self) -> Vec<String> {
        self.machine.state().into_keys().collect()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.machine.state_get(name)
    }

    pub fn set(&self, name: &str, value: Value) {
        self.machine.state_set(name, value);
    }

    pub fn state(&self) -> Object {
        self.machine.state()
    }

    pub fn config(&self) -> &NativeConfig {
        &self.machine.config
    }

    /// Calls the function stored under `name`.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, NativeError> {
        let func = self.function(name)?;
        Ok(call_value(&func, args)?)
    }

    /// Like [`CompiledProgram::call`], with the keys of `context` readable as
    /// names for the duration of the call. Context names shadow state
    /// properties; parameters and locals shadow both.
    pub fn call_with_context(
        &self,
        name: &str,
        args: Vec<Value>,
        context: &Object,
    ) -> Result<Value, NativeError> {
        let func = self.function(name)?;
        Ok(self
            .machine
            .with_context(context.clone(), || call_value(&func, args))?)
    }

    /// Calls any function value, such as one returned from a method.
    pub fn apply(&self, func: &Value, args: Vec<Value>) -> Result<Value, NativeError> {
        Ok(call_value(func, args)?)
    }

    /// Compiles and runs a statement list against this program's state.
    /// Keys of `context` are bound as parameters.
    pub fn evaluate(&self, source: &str, context: &Object) -> Result<Value, NativeError> {
        let tokens = tokenize(source).map_err(SyntaxError::from)?;
        let script = Parser::with_options(tokens, &ParseOptions::default())
            .parse_script()
            .map_err(SyntaxError::from)?;

        let params: Vec<String> = context.keys().cloned().collect();
        let mut compiler = Compiler::new(&self.machine.primitives, &self.globals);
        let func = compiler.function("script", &params, &script)?;
        let args = context.values().cloned().collect();
        Ok(self.machine.invoke(&func, None, args)?)
    }

    fn function(&self, name: &str) -> Result<Value, NativeError> {
        self.machine
            .state_get(name)
            .filter(Value::is_callable)
            .ok_or_else(|| NativeError::NoSuchFunction(name.to_string()))
    }
}

impl fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("definitions", &self.definitions)
            .finish_non_exhaustive()
    }
}

/// Compiles a parsed program with the standard library and default limits.
pub fn compile(program: &Program) -> Result<CompiledProgram, NativeError> {
    CompiledProgram::compile(program, &NativeConfig::default(), Primitives::standard())
}

/// Lexes, parses and compiles program source.
pub fn compile_source(source: &str, config: &NativeConfig) -> Result<CompiledProgram, NativeError> {
    let tokens = tokenize(source).map_err(SyntaxError::from)?;
    let program = Parser::with_options(tokens, &ParseOptions::default())
        .parse_program()
        .map_err(SyntaxError::from)?;
    CompiledProgram::compile(&program, config, Primitives::standard())
}
