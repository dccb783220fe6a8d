//! Policy documents
//!
//! A policy combines an effect with pattern sets for four dimensions
//! (action, role, resource, scope) and named conditions. Policies are built
//! once, either programmatically or from [`PolicyOptions`], and are
//! read-only afterwards.

use super::condition::{Condition, ConditionOptions, ConditionRegistry, Conditions};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Effect of a matching policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Allow the request
    #[serde(alias = "Allow")]
    Allow,
    /// Deny the request (takes precedence over Allow)
    #[serde(alias = "Deny")]
    Deny,
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Allow => f.write_str("allow"),
            Effect::Deny => f.write_str("deny"),
        }
    }
}

/// Declarative (persistable) form of a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyOptions {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub effect: Effect,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionOptions>,
}

impl PolicyOptions {
    /// Validate policy structure
    ///
    /// Empty pattern sets are allowed; they simply never match.
    pub fn validate(&self) -> Result<()> {
        check_shape(
            &self.id,
            [&self.actions[..], &self.roles[..], &self.resources[..], &self.scopes[..]],
            self.conditions.iter().map(|c| c.name.as_str()),
        )
    }
}

/// Invariants shared by [`PolicyOptions::validate`] and [`PolicyBuilder::build`]
fn check_shape<'a>(
    id: &str,
    [actions, roles, resources, scopes]: [&[String]; 4],
    condition_names: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidPolicy("policy id cannot be empty".to_string()));
    }

    let dimensions = [
        ("action", actions),
        ("role", roles),
        ("resource", resources),
        ("scope", scopes),
    ];
    for (dimension, patterns) in dimensions {
        if patterns.iter().any(|p| p.is_empty()) {
            return Err(Error::InvalidPolicy(format!(
                "policy {} has an empty {} pattern",
                id, dimension
            )));
        }
    }

    if condition_names.into_iter().any(str::is_empty) {
        return Err(Error::InvalidPolicy(format!(
            "policy {} has a condition without a name",
            id
        )));
    }

    Ok(())
}

/// A collection of policy documents, as stored in a JSON or TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySet {
    #[serde(default)]
    pub policies: Vec<PolicyOptions>,
}

impl PolicySet {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// An access rule
#[derive(Debug, Clone)]
pub struct Policy {
    id: String,
    description: String,
    effect: Effect,
    actions: Vec<String>,
    roles: Vec<String>,
    resources: Vec<String>,
    scopes: Vec<String>,
    conditions: Conditions,
}

impl Policy {
    /// Start building a policy
    ///
    /// # Examples
    /// ```
    /// use gatekeeper::{Effect, Policy};
    ///
    /// let policy = Policy::builder("p1", Effect::Allow)
    ///     .actions(["read"])
    ///     .roles(["admin"])
    ///     .resources(["*"])
    ///     .scopes(["default"])
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(policy.id(), "p1");
    /// assert_eq!(policy.actions(), ["read"]);
    /// ```
    pub fn builder(id: impl Into<String>, effect: Effect) -> PolicyBuilder {
        PolicyBuilder {
            id: id.into(),
            description: String::new(),
            effect,
            actions: Vec::new(),
            roles: Vec::new(),
            resources: Vec::new(),
            scopes: Vec::new(),
            conditions: Conditions::new(),
        }
    }

    /// Build a policy from its declarative form, materializing conditions
    /// through `registry`
    pub fn from_options(opts: PolicyOptions, registry: &ConditionRegistry) -> Result<Self> {
        opts.validate()?;
        let conditions = registry.build(&opts.conditions)?;

        Ok(Policy {
            id: opts.id,
            description: opts.description,
            effect: opts.effect,
            actions: opts.actions,
            roles: opts.roles,
            resources: opts.resources,
            scopes: opts.scopes,
            conditions,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }
}

/// Builder returned by [`Policy::builder`]
#[derive(Debug)]
pub struct PolicyBuilder {
    id: String,
    description: String,
    effect: Effect,
    actions: Vec<String>,
    roles: Vec<String>,
    resources: Vec<String>,
    scopes: Vec<String>,
    conditions: Conditions,
}

fn patterns<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl PolicyBuilder {
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn actions<I: IntoIterator<Item = S>, S: Into<String>>(mut self, actions: I) -> Self {
        self.actions = patterns(actions);
        self
    }

    #[must_use]
    pub fn roles<I: IntoIterator<Item = S>, S: Into<String>>(mut self, roles: I) -> Self {
        self.roles = patterns(roles);
        self
    }

    #[must_use]
    pub fn resources<I: IntoIterator<Item = S>, S: Into<String>>(mut self, resources: I) -> Self {
        self.resources = patterns(resources);
        self
    }

    #[must_use]
    pub fn scopes<I: IntoIterator<Item = S>, S: Into<String>>(mut self, scopes: I) -> Self {
        self.scopes = patterns(scopes);
        self
    }

    /// Attach a condition under the metadata key it reads
    #[must_use]
    pub fn condition(mut self, key: impl Into<String>, condition: impl Condition + 'static) -> Self {
        self.conditions.insert(key.into(), Arc::new(condition));
        self
    }

    pub fn build(self) -> Result<Policy> {
        check_shape(
            &self.id,
            [&self.actions[..], &self.roles[..], &self.resources[..], &self.scopes[..]],
            self.conditions.keys().map(String::as_str),
        )?;

        Ok(Policy {
            id: self.id,
            description: self.description,
            effect: self.effect,
            actions: self.actions,
            roles: self.roles,
            resources: self.resources,
            scopes: self.scopes,
            conditions: self.conditions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::iam::BoolCondition;
    use serde_json::json;

    #[test]
    fn test_policy_builder() {
        let policy = Policy::builder("p1", Effect::Deny)
            .description("deny secret reads")
            .actions(["read"])
            .roles(["admin", "editor"])
            .resources(["doc1"])
            .scopes(["default"])
            .condition("mfa", BoolCondition { value: false })
            .build()
            .unwrap();

        assert_eq!(policy.id(), "p1");
        assert_eq!(policy.description(), "deny secret reads");
        assert_eq!(policy.effect(), Effect::Deny);
        assert_eq!(policy.roles().len(), 2);
        assert_eq!(policy.conditions().len(), 1);
        assert_eq!(policy.conditions()["mfa"].name(), "bool");
    }

    #[test]
    fn test_builder_rejects_empty_id() {
        assert!(Policy::builder("  ", Effect::Allow).build().is_err());
    }

    #[test]
    fn test_builder_matches_options_validation() {
        let empty_pattern = Policy::builder("p1", Effect::Allow)
            .actions(["read"])
            .resources(["docs/*", ""])
            .build();
        assert!(matches!(empty_pattern, Err(Error::InvalidPolicy(_))));

        let unnamed_condition = Policy::builder("p1", Effect::Allow)
            .actions(["read"])
            .condition("", BoolCondition { value: true })
            .build();
        assert!(matches!(unnamed_condition, Err(Error::InvalidPolicy(_))));

        // Empty pattern sets stay legal on both paths
        assert!(Policy::builder("p1", Effect::Allow).build().is_ok());
    }

    #[test]
    fn test_effect_serde() {
        assert_eq!(serde_json::to_string(&Effect::Allow).unwrap(), "\"allow\"");
        let effect: Effect = serde_json::from_str("\"Deny\"").unwrap();
        assert_eq!(effect, Effect::Deny);
        assert_eq!(Effect::Deny.to_string(), "deny");
    }

    #[test]
    fn test_policy_from_options() {
        let opts: PolicyOptions = serde_json::from_value(json!({
            "id": "office-only",
            "effect": "allow",
            "actions": ["read", "write"],
            "roles": ["staff"],
            "resources": ["reports/*"],
            "scopes": ["default"],
            "conditions": [
                {"name": "remote_ip", "type": "ip_whitelist", "options": {"networks": ["10.0.0.0/24"]}},
                {"name": "geo", "type": "unregistered"}
            ]
        }))
        .unwrap();

        let policy = Policy::from_options(opts, &ConditionRegistry::new()).unwrap();
        assert_eq!(policy.id(), "office-only");
        assert_eq!(policy.effect(), Effect::Allow);
        assert_eq!(policy.actions().len(), 2);
        // Unregistered condition types are dropped
        assert_eq!(policy.conditions().len(), 1);
        assert!(policy.conditions().contains_key("remote_ip"));
    }

    #[test]
    fn test_policy_options_validation() {
        let mut opts = PolicyOptions {
            id: "p1".to_string(),
            description: String::new(),
            effect: Effect::Allow,
            actions: vec!["read".to_string()],
            roles: vec![],
            resources: vec![],
            scopes: vec![],
            conditions: vec![],
        };
        assert!(opts.validate().is_ok());

        opts.resources = vec![String::new()];
        assert!(matches!(opts.validate(), Err(Error::InvalidPolicy(_))));

        opts.resources.clear();
        opts.id = String::new();
        assert!(matches!(opts.validate(), Err(Error::InvalidPolicy(_))));
    }

    #[test]
    fn test_policy_set_toml() {
        let set = PolicySet::from_toml(
            r#"
            [[policies]]
            id = "p1"
            effect = "allow"
            actions = ["read"]
            roles = ["admin"]
            resources = ["*"]
            scopes = ["default"]

            [[policies]]
            id = "p2"
            effect = "deny"
            actions = ["read"]
            roles = ["admin"]
            resources = ["doc1"]
            scopes = ["default"]

            [[policies.conditions]]
            name = "mfa"
            type = "bool"
            options = { value = false }
            "#,
        )
        .unwrap();

        assert_eq!(set.policies.len(), 2);
        assert_eq!(set.policies[1].effect, Effect::Deny);
        assert_eq!(set.policies[1].conditions[0].options["value"], json!(false));
    }

    #[test]
    fn test_policy_set_json_roundtrip() {
        let set = PolicySet::from_json(
            r#"{"policies": [{"id": "p1", "effect": "allow", "actions": ["read"]}]}"#,
        )
        .unwrap();
        let parsed = PolicySet::from_json(&set.to_json().unwrap()).unwrap();
        assert_eq!(parsed, set);
    }
}
