//! List-expression evaluator for Sprig.
//!
//! [`Evaluator`] walks list-expressions against an [`Env`] chain. Calls
//! resolve against bound closures first and the injected [`Primitives`]
//! second; a fixed set of special forms (`if`, `let`, `lambda`, ...) is
//! handled by the evaluator itself.
//!
//! [`selfhost`] bootstraps the compiler written in Sprig itself, running it
//! on this evaluator.
//!
//! [`Env`]: rhizome_sprig_ir::Env
//! [`Primitives`]: rhizome_sprig_ir::Primitives

mod evaluator;
mod forms;
pub mod selfhost;

pub use evaluator::{DEFAULT_MAX_DEPTH, EvalConfig, Evaluator};

use rhizome_sprig_ir::EvalError;
use rhizome_sprig_syntax::SyntaxError;
use thiserror::Error;

/// Errors from evaluating source text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

#[cfg(test)]
mod tests;
