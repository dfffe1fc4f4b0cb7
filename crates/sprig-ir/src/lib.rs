//! List-expression values, environments and primitives for Sprig.
//!
//! This crate defines the value algebra shared by the syntax frontend,
//! the expression evaluator and the native backend.
//!
//! # List-expression format
//!
//! A list-expression is either:
//! - An atom (null, bool, number, string, symbol)
//! - An ordered sequence of list-expressions
//!
//! A sequence whose head is a symbol is a call when evaluated:
//! ```text
//! (progn
//!   (define x 10)
//!   (+ x 5))
//! ```
//!
//! On the wire the same value is a JSON array in which symbols are plain
//! strings and string literals carry the [`wire::STRING_SENTINEL`] prefix.

mod env;
mod error;
pub mod ops;
pub mod stdlib;
mod validation;
mod value;
pub mod wire;

pub use env::{Env, THIS};
pub use error::EvalError;
pub use stdlib::{Host, PrimitiveFn, Primitives};
pub use validation::{ValidationError, validate};
pub use value::{Closure, NativeFn, Object, Value};

#[cfg(test)]
mod tests;
