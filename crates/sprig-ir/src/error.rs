//! Evaluation errors shared by every execution backend.

use thiserror::Error;

/// Errors raised while evaluating list-expressions or compiled programs.
///
/// Effects applied before the failure point are kept; nothing is rolled back.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("cannot call non-function value: {0}")]
    NotCallable(String),

    #[error("maximum evaluation depth of {0} exceeded")]
    MaxDepth(usize),

    #[error("type error: {0}")]
    Type(String),

    #[error("invalid argument count for {name}: expected {expected}, got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("malformed {form}: {reason}")]
    Malformed { form: String, reason: String },

    #[error("{0}")]
    Raised(String),

    #[error("loop exceeded {0} iterations")]
    LoopLimit(usize),
}

impl EvalError {
    pub fn arity(name: &str, expected: &'static str, got: usize) -> Self {
        EvalError::Arity {
            name: name.to_string(),
            expected,
            got,
        }
    }

    pub fn malformed(form: &str, reason: impl Into<String>) -> Self {
        EvalError::Malformed {
            form: form.to_string(),
            reason: reason.into(),
        }
    }
}
