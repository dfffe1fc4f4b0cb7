//! Native backend for Sprig.
//!
//! Compiles a parsed program directly to Rust closures instead of
//! list-expressions. Identifier resolution happens once, at compile time:
//! every name becomes a parameter slot, a primitive, or a property of the
//! program's shared state object.
//!
//! All definitions share one state object, so methods read and write each
//! other's properties. `this` denotes that object.

mod codegen;
mod machine;
mod program;

pub use codegen::CompileError;
pub use program::{CompiledProgram, compile, compile_source};

use rhizome_sprig_ir::EvalError;
use rhizome_sprig_syntax::SyntaxError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    /// Maximum nesting of function calls.
    pub max_depth: usize,
    /// Iterations a single loop may run before failing.
    pub max_loop_iterations: usize,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            max_depth: 500,
            max_loop_iterations: 1_000_000,
        }
    }
}

/// Errors from compiling or running a native program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("compilation error: {0}")]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("no function named {0}")]
    NoSuchFunction(String),
}
