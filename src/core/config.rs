//! Enforcer configuration
//!
//! Loaded once at startup, typically from a TOML file:
//!
//! ```toml
//! default_effect = "deny"
//! ```

use crate::core::iam::Effect;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcerConfig {
    /// Outcome when no policy allows a request
    #[serde(default = "default_effect")]
    pub default_effect: Effect,
}

fn default_effect() -> Effect {
    Effect::Deny
}

impl EnforcerConfig {
    pub fn new(default_effect: Effect) -> Self {
        EnforcerConfig { default_effect }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!("Loading enforcer config from {:?}", path.as_ref());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self::new(default_effect())
    }
}
