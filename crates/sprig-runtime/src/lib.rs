//! Runtime bridge for Sprig.
//!
//! A [`Surface`] owns one loaded program and the state object its
//! definitions live in. Hosts dispatch named actions against it with
//! [`Surface::handle_action`]; an action may return an update description
//! (see [`update`]) which is written back onto the state.

mod config;
mod lang;
mod surface;
pub mod update;

pub use config::{ConfigError, RuntimeConfig, SprigConfig};
pub use lang::Lang;
pub use surface::Surface;

use rhizome_sprig_eval::selfhost::BootstrapError;
use rhizome_sprig_ir::wire::WireError;
use rhizome_sprig_ir::{EvalError, ValidationError};
use rhizome_sprig_runtime_native::NativeError;
use rhizome_sprig_syntax::SyntaxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Native(#[from] NativeError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("invalid program: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid state path: {0:?}")]
    InvalidPath(String),

    #[error("expected an object or a list of [path, value] pairs, got {0}")]
    InvalidUpdate(&'static str),
}

impl From<rhizome_sprig_eval::Error> for RuntimeError {
    fn from(err: rhizome_sprig_eval::Error) -> Self {
        match err {
            rhizome_sprig_eval::Error::Syntax(err) => RuntimeError::Syntax(err),
            rhizome_sprig_eval::Error::Eval(err) => RuntimeError::Eval(err),
        }
    }
}
