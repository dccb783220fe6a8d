//! # Gatekeeper - Embeddable Authorization Decisions
//!
//! `gatekeeper` decides whether a request (role, action, resource, scope)
//! is permitted by a set of declarative policies. It is meant to be the
//! single decision point inside a larger service:
//!
//! - **Deny overrides allow**: any matching Deny policy wins
//! - **Default effect**: configurable outcome when nothing allows a request
//! - **Pluggable matchers**: glob (default), hierarchical paths, exact
//! - **Named conditions**: `bool`, `role_equals`, `ip_whitelist`, or your own
//! - **Auditing**: optional sink for every decision
//!
//! Policy storage and audit persistence are left to the embedding
//! application through the [`PolicyManager`] and [`Auditor`] traits.
//!
//! ## Quick Start
//!
//! ```rust
//! use gatekeeper::{Effect, Enforcer, MemoryPolicyManager, Policy, Request, Result};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<()> {
//! let manager = MemoryPolicyManager::with_policies([
//!     Policy::builder("readers", Effect::Allow)
//!         .actions(["read"])
//!         .roles(["admin", "viewer"])
//!         .resources(["*"])
//!         .scopes(["default"])
//!         .build()?,
//!     Policy::builder("no-secrets", Effect::Deny)
//!         .actions(["*"])
//!         .roles(["*"])
//!         .resources(["secrets/*"])
//!         .scopes(["*"])
//!         .build()?,
//! ])?;
//!
//! let enforcer = Enforcer::with_defaults(Arc::new(manager));
//!
//! enforcer.enforce(&Request::new("viewer", "read", "reports/q3", "default"))?;
//!
//! let err = enforcer
//!     .enforce(&Request::new("admin", "read", "secrets/db", "default"))
//!     .unwrap_err();
//! assert_eq!(err.denying_policy(), Some("no-secrets"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Policies from Documents
//!
//! ```rust
//! use gatekeeper::{ConditionRegistry, Enforcer, MemoryPolicyManager, PolicySet, Request};
//! use std::sync::Arc;
//!
//! let set = PolicySet::from_json(r#"{
//!     "policies": [{
//!         "id": "office-network",
//!         "effect": "allow",
//!         "actions": ["read"],
//!         "roles": ["staff"],
//!         "resources": ["*"],
//!         "scopes": ["*"],
//!         "conditions": [
//!             {"name": "remote_ip", "type": "ip_whitelist",
//!              "options": {"networks": ["10.0.0.0/24"]}}
//!         ]
//!     }]
//! }"#).unwrap();
//!
//! let manager = MemoryPolicyManager::new();
//! manager.load_options(set.policies, &ConditionRegistry::new()).unwrap();
//! let enforcer = Enforcer::with_defaults(Arc::new(manager));
//!
//! let inside = Request::new("staff", "read", "doc", "default").with_metadata("remote_ip", "10.0.0.5");
//! let outside = Request::new("staff", "read", "doc", "default").with_metadata("remote_ip", "10.0.1.5");
//! assert!(enforcer.enforce(&inside).is_ok());
//! assert!(enforcer.enforce(&outside).is_err());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   find_by_request   ┌───────────────┐
//! │ Enforcer │ ──────────────────▶ │ PolicyManager │
//! └────┬─────┘                     └───────────────┘
//!      │ per candidate policy
//!      ├──▶ Matcher     action → role → resource → scope
//!      ├──▶ Conditions  metadata[key] for every attached condition
//!      │
//!      ├── Deny matched   → Error::DeniedExplicit (stop)
//!      ├── Allow matched  → remember, keep going
//!      └── none allowed   → default effect (Error::DeniedImplicit on Deny)
//!                 │
//!                 ▼
//!             Auditor (optional)
//! ```

pub mod core;
pub mod error;

pub use crate::core::{
    audit::{AuditRecord, Auditor, MemoryAuditor, TracingAuditor},
    config::EnforcerConfig,
    iam::{
        BoolCondition, Condition, ConditionBuilder, ConditionKind, ConditionOptions,
        ConditionRegistry, Conditions, Effect, Enforcer, ExactMatcher, GlobMatcher,
        IpWhitelistCondition, Matcher, MemoryPolicyManager, OptionMap, PathMatcher, Policy,
        PolicyBuilder, PolicyManager, PolicyOptions, PolicySet, Request, RequestMetadata,
        RoleEqualsCondition, Value,
    },
};
pub use error::{Error, MatchError, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
