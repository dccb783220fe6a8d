//! Error types for policy evaluation and policy management

use thiserror::Error;

/// Failure reported by a [`Matcher`](crate::core::iam::Matcher)
#[derive(Error, Debug)]
pub enum MatchError {
    /// Pattern contained an embedded expression that failed to compile
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Pattern opened a `<` expression without closing it
    #[error("unbalanced '<' delimiter in pattern '{pattern}'")]
    UnbalancedDelimiter { pattern: String },

    /// Failure raised by a custom matcher implementation
    #[error("matcher error: {0}")]
    Custom(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("access denied by policy {policy_id}")]
    DeniedExplicit { policy_id: String },

    #[error("access denied because no policy allowed access")]
    DeniedImplicit,

    /// Policy manager failed to produce candidates (shown verbatim)
    #[error(transparent)]
    Manager(anyhow::Error),

    #[error("matcher failed: {0}")]
    Matcher(#[from] MatchError),

    #[error("failed to decode options for condition '{name}' of type '{kind}': {source}")]
    ConditionDecode {
        name: String,
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Policy already exists: {0}")]
    DuplicatePolicy(String),

    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for both explicit and implicit denials
    pub fn is_denied(&self) -> bool {
        matches!(self, Error::DeniedExplicit { .. } | Error::DeniedImplicit)
    }

    pub fn is_explicit_denial(&self) -> bool {
        matches!(self, Error::DeniedExplicit { .. })
    }

    pub fn is_implicit_denial(&self) -> bool {
        matches!(self, Error::DeniedImplicit)
    }

    /// Identity of the policy responsible for an explicit denial
    pub fn denying_policy(&self) -> Option<&str> {
        match self {
            Error::DeniedExplicit { policy_id } => Some(policy_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
