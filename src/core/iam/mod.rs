//! Policy-based authorization
//!
//! Provides the decision pipeline with:
//! - Allow/Deny policies with explicit deny precedence
//! - Pluggable pattern matching for actions, roles, resources and scopes
//! - Named conditions evaluated against request metadata
//! - A condition registry for materializing policies from documents

mod condition;
mod enforcer;
mod manager;
mod matcher;
mod pattern;
mod policy;
mod request;

pub use condition::{
    BoolCondition, Condition, ConditionBuilder, ConditionKind, ConditionOptions,
    ConditionRegistry, Conditions, IpWhitelistCondition, OptionMap, RoleEqualsCondition,
};
pub use enforcer::Enforcer;
pub use manager::{MemoryPolicyManager, PolicyManager};
pub use matcher::{ExactMatcher, GlobMatcher, Matcher};
pub use pattern::PathMatcher;
pub use policy::{Effect, Policy, PolicyBuilder, PolicyOptions, PolicySet};
pub use request::{Request, RequestMetadata, Value};
