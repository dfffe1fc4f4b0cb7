//! Configuration loading.

use rhizome_sprig_eval::EvalConfig;
use rhizome_sprig_eval::selfhost::BootstrapLimits;
use rhizome_sprig_runtime_native::NativeConfig;
use rhizome_sprig_syntax::ParseOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::Lang;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Language used when a caller does not name one.
    pub default_lang: Lang,
    /// Action run after every handled action, when the program defines it.
    pub derived_action: String,
    /// Reserved action that writes its context straight into the state.
    pub set_state_action: String,
    /// Evaluation depth for the self-hosted compiler.
    pub self_hosted_max_depth: usize,
    /// Stack size, in MiB, of the thread the self-hosted compiler runs on.
    pub self_hosted_stack_mb: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let limits = BootstrapLimits::default();
        Self {
            default_lang: Lang::Surface,
            derived_action: "updateDerived".into(),
            set_state_action: "setState".into(),
            self_hosted_max_depth: limits.max_depth,
            self_hosted_stack_mb: limits.stack_bytes / (1024 * 1024),
        }
    }
}

impl RuntimeConfig {
    pub fn bootstrap_limits(&self) -> BootstrapLimits {
        BootstrapLimits {
            max_depth: self.self_hosted_max_depth,
            stack_bytes: self.self_hosted_stack_mb * 1024 * 1024,
        }
    }
}

/// Settings for every stage, as read from a `sprig.toml`:
///
/// ```toml
/// [parse]
/// max_depth = 50
///
/// [eval]
/// max_depth = 500
///
/// [native]
/// max_loop_iterations = 10000
///
/// [runtime]
/// default_lang = "native"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprigConfig {
    pub parse: ParseOptions,
    pub eval: EvalConfig,
    pub native: NativeConfig,
    pub runtime: RuntimeConfig,
}

impl SprigConfig {
    /// Load configuration from a TOML file. Missing keys take defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}
