//! Self-hosted compiler bootstrap.
//!
//! `bootstrap/compiler.sprig` is a Sprig program implementing the same
//! lexer, parser and lowering as the native frontend. It is compiled by the
//! native frontend, evaluated into a state environment, and its
//! `compileToSexpr` method is then used as a compiler.
//!
//! The self-hosted compiler recurses through the evaluator for every
//! character and token, so it needs a far larger depth budget than ordinary
//! programs. [`compile_on_thread`] runs it on a thread with a matching stack.

use crate::{EvalConfig, Evaluator};
use rhizome_sprig_ir::{Env, EvalError, Value, wire};
use rhizome_sprig_syntax::{ParseOptions, SyntaxError, compile_program};
use thiserror::Error;

/// Source of the self-hosted compiler.
pub const COMPILER_SOURCE: &str = include_str!("bootstrap/compiler.sprig");

/// Name of the compiler entry point inside the compiler program.
pub const ENTRY_POINT: &str = "compileToSexpr";

/// Alias bound next to [`ENTRY_POINT`] in the compiler's environment.
pub const ENTRY_ALIAS: &str = "compile-to-sexpr";

/// Evaluation depth used by [`compile_on_thread`].
pub const BOOTSTRAP_MAX_DEPTH: usize = 20_000;

/// Stack size of the [`compile_on_thread`] worker.
pub const BOOTSTRAP_STACK_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("compiler source failed to compile: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("self-hosted compiler failed: {0}")]
    Eval(#[from] EvalError),

    #[error("compiler program does not define a function named {0}")]
    MissingEntry(&'static str),

    #[error("wire error: {0}")]
    Wire(#[from] wire::WireError),

    #[error("bootstrap thread failed: {0}")]
    Thread(String),
}

/// The compiler program, loaded and ready to compile sources.
pub struct SelfHostedCompiler {
    evaluator: Evaluator,
    env: Env,
    entry: Value,
}

impl SelfHostedCompiler {
    /// Compiles [`COMPILER_SOURCE`] with the native frontend and evaluates
    /// it in a fresh state environment.
    pub fn load(evaluator: &Evaluator) -> Result<Self, BootstrapError> {
        let code = compile_program(COMPILER_SOURCE, &ParseOptions::default())?;
        let env = Env::new_state();
        evaluator.evaluate(&code, &env)?;

        let entry = env
            .lookup(ENTRY_POINT)
            .filter(Value::is_callable)
            .ok_or(BootstrapError::MissingEntry(ENTRY_POINT))?;
        env.define(ENTRY_ALIAS, entry.clone());
        tracing::debug!(bindings = env.names().len(), "loaded self-hosted compiler");

        Ok(Self {
            evaluator: evaluator.clone(),
            env,
            entry,
        })
    }

    /// The environment holding the compiler's definitions.
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Compiles `source` to a list-expression.
    pub fn compile(&self, source: &str) -> Result<Value, EvalError> {
        self.evaluator
            .apply(&self.entry, vec![Value::str(source)])
    }
}

/// Limits for a bootstrap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapLimits {
    pub max_depth: usize,
    pub stack_bytes: usize,
}

impl Default for BootstrapLimits {
    fn default() -> Self {
        Self {
            max_depth: BOOTSTRAP_MAX_DEPTH,
            stack_bytes: BOOTSTRAP_STACK_BYTES,
        }
    }
}

/// Bootstraps the compiler on a dedicated large-stack thread, compiles
/// `source` there and hands the result back.
///
/// Values are not `Send`, so the result crosses the thread boundary in wire
/// form.
pub fn compile_on_thread(source: &str) -> Result<Value, BootstrapError> {
    compile_on_thread_with(source, BootstrapLimits::default())
}

pub fn compile_on_thread_with(
    source: &str,
    limits: BootstrapLimits,
) -> Result<Value, BootstrapError> {
    let source = source.to_string();
    let worker = std::thread::Builder::new()
        .name("sprig-bootstrap".into())
        .stack_size(limits.stack_bytes)
        .spawn(move || -> Result<String, BootstrapError> {
            let evaluator = Evaluator::new(EvalConfig {
                max_depth: limits.max_depth,
            });
            let compiler = SelfHostedCompiler::load(&evaluator)?;
            let value = compiler.compile(&source)?;
            Ok(wire::to_string(&value)?)
        })
        .map_err(|e| BootstrapError::Thread(e.to_string()))?;

    let text = worker
        .join()
        .map_err(|_| BootstrapError::Thread("worker panicked".into()))??;
    Ok(wire::from_str(&text)?)
}
