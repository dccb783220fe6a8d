//! Conditions attached to policies
//!
//! A condition is a named predicate over one value from the request
//! metadata. Policies carry conditions keyed by the metadata key they read:
//! - `bool` - metadata value is a boolean equal to the configured `value`
//! - `role_equals` - metadata value is a string equal to the request role
//! - `ip_whitelist` - metadata value is an IP inside one of the configured `networks`
//!
//! Conditions never fail. A missing key or a value of the wrong shape is
//! simply "no match".

use super::{Request, Value};
use crate::error::{Error, Result};
use ipnet::IpNet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::warn;

/// Free-form option bag decoded into a condition's configuration
pub type OptionMap = serde_json::Map<String, serde_json::Value>;

/// A predicate over a single metadata value
pub trait Condition: fmt::Debug + Send + Sync {
    /// Stable identity of the condition variant (its registry name)
    fn name(&self) -> &str;

    /// Evaluate the looked-up metadata `value` for `request`
    fn meets(&self, value: Option<&Value>, request: &Request) -> bool;
}

/// Condition variant that can be decoded from an option bag
pub trait ConditionKind: Condition + DeserializeOwned + Default + 'static {
    const NAME: &'static str;
}

/// Conditions attached to a policy, keyed by metadata key
pub type Conditions = BTreeMap<String, Arc<dyn Condition>>;

/// Produces a fresh condition from its option bag
pub type ConditionBuilder = Arc<
    dyn Fn(&OptionMap) -> std::result::Result<Box<dyn Condition>, serde_json::Error>
        + Send
        + Sync,
>;

/// Declarative description of one condition on a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionOptions {
    /// Metadata key the condition reads (and its key on the policy)
    pub name: String,
    /// Registry name of the condition variant
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub options: OptionMap,
}

impl ConditionOptions {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        ConditionOptions {
            name: name.into(),
            kind: kind.into(),
            options: OptionMap::new(),
        }
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

fn decode<C: ConditionKind>(
    options: &OptionMap,
) -> std::result::Result<Box<dyn Condition>, serde_json::Error> {
    if options.is_empty() {
        return Ok(Box::new(C::default()));
    }
    let condition: C = serde_json::from_value(serde_json::Value::Object(options.clone()))?;
    Ok(Box::new(condition))
}

/// Registry of condition builders keyed by variant name
///
/// Populate it while composing the application; it is only read while
/// policies are being built.
#[derive(Clone)]
pub struct ConditionRegistry {
    builders: HashMap<String, ConditionBuilder>,
}

impl ConditionRegistry {
    /// Registry containing the built-in conditions
    pub fn new() -> Self {
        let mut registry = ConditionRegistry {
            builders: HashMap::new(),
        };
        registry.register_kind::<BoolCondition>();
        registry.register_kind::<RoleEqualsCondition>();
        registry.register_kind::<IpWhitelistCondition>();
        registry
    }

    /// Register (or replace) a builder under `name`
    pub fn register(&mut self, name: impl Into<String>, builder: ConditionBuilder) {
        self.builders.insert(name.into(), builder);
    }

    /// Register a decodable condition under its own name
    pub fn register_kind<C: ConditionKind>(&mut self) {
        let builder: ConditionBuilder = Arc::new(decode::<C>);
        self.register(C::NAME, builder);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    /// Materialize conditions from their declarative options
    ///
    /// Entries whose type is not registered are skipped. A decode failure
    /// aborts the whole build.
    ///
    /// # Examples
    /// ```
    /// use gatekeeper::{ConditionOptions, ConditionRegistry};
    /// use serde_json::json;
    ///
    /// let registry = ConditionRegistry::new();
    /// let conditions = registry
    ///     .build(&[
    ///         ConditionOptions::new("mfa", "bool").with_option("value", json!(true)),
    ///         ConditionOptions::new("geo", "not_registered"),
    ///     ])
    ///     .unwrap();
    ///
    /// assert_eq!(conditions.len(), 1);
    /// assert_eq!(conditions["mfa"].name(), "bool");
    /// ```
    pub fn build(&self, options: &[ConditionOptions]) -> Result<Conditions> {
        let mut conditions = Conditions::new();

        for opt in options {
            let Some(builder) = self.builders.get(&opt.kind) else {
                warn!(
                    "Skipping condition '{}': type '{}' is not registered",
                    opt.name, opt.kind
                );
                continue;
            };

            let condition = builder(&opt.options).map_err(|source| Error::ConditionDecode {
                name: opt.name.clone(),
                kind: opt.kind.clone(),
                source,
            })?;

            conditions.insert(opt.name.clone(), Arc::from(condition));
        }

        Ok(conditions)
    }
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.builders.keys().collect();
        names.sort();
        f.debug_struct("ConditionRegistry")
            .field("builders", &names)
            .finish()
    }
}

/// Matches a boolean metadata value against the configured one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoolCondition {
    #[serde(default)]
    pub value: bool,
}

impl Condition for BoolCondition {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn meets(&self, value: Option<&Value>, _request: &Request) -> bool {
        value.and_then(Value::as_bool) == Some(self.value)
    }
}

impl ConditionKind for BoolCondition {
    const NAME: &'static str = "bool";
}

/// Matches when the metadata value equals the request role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEqualsCondition {}

impl Condition for RoleEqualsCondition {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn meets(&self, value: Option<&Value>, request: &Request) -> bool {
        value.and_then(Value::as_str) == Some(request.role.as_str())
    }
}

impl ConditionKind for RoleEqualsCondition {
    const NAME: &'static str = "role_equals";
}

/// CIDR whitelist for an IP address carried in metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpWhitelistCondition {
    #[serde(default)]
    pub networks: Vec<String>,
}

impl Condition for IpWhitelistCondition {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn meets(&self, value: Option<&Value>, _request: &Request) -> bool {
        let Some(ip) = value
            .and_then(Value::as_str)
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        else {
            return false;
        };

        // A malformed network only disqualifies itself
        self.networks.iter().any(|network| {
            network
                .trim()
                .parse::<IpNet>()
                .map(|net| net.contains(&ip))
                .unwrap_or(false)
        })
    }
}

impl ConditionKind for IpWhitelistCondition {
    const NAME: &'static str = "ip_whitelist";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> Request {
        Request::new("admin", "read", "doc1", "default")
    }

    #[test]
    fn test_bool_condition() {
        let cond = BoolCondition { value: true };
        let req = request();

        assert!(cond.meets(Some(&Value::Bool(true)), &req));
        assert!(!cond.meets(Some(&Value::Bool(false)), &req));
        assert!(!cond.meets(Some(&Value::from("true")), &req)); // wrong type
        assert!(!cond.meets(None, &req)); // absent key
    }

    #[test]
    fn test_bool_condition_false_value() {
        let cond = BoolCondition::default();
        let req = request();

        assert!(cond.meets(Some(&Value::Bool(false)), &req));
        assert!(!cond.meets(Some(&Value::Bool(true)), &req));
        assert!(!cond.meets(None, &req));
    }

    #[test]
    fn test_role_equals_condition() {
        let cond = RoleEqualsCondition {};
        let req = request();

        assert!(cond.meets(Some(&Value::from("admin")), &req));
        assert!(!cond.meets(Some(&Value::from("Admin")), &req)); // case-sensitive
        assert!(!cond.meets(Some(&Value::from("editor")), &req));
        assert!(!cond.meets(Some(&Value::Bool(true)), &req));
        assert!(!cond.meets(None, &req));
    }

    #[test]
    fn test_ip_whitelist_condition() {
        let cond = IpWhitelistCondition {
            networks: vec!["10.0.0.0/24".to_string()],
        };
        let req = request();

        assert!(cond.meets(Some(&Value::from("10.0.0.5")), &req));
        assert!(!cond.meets(Some(&Value::from("10.0.1.5")), &req));
        assert!(!cond.meets(Some(&Value::Number(10.0)), &req));
        assert!(!cond.meets(Some(&Value::from("not-an-ip")), &req));
        assert!(!cond.meets(None, &req));
    }

    #[test]
    fn test_ip_whitelist_skips_malformed_networks() {
        let cond = IpWhitelistCondition {
            networks: vec![
                "garbage".to_string(),
                "192.168.0.0/16".to_string(),
                "fd00::/8".to_string(),
            ],
        };
        let req = request();

        assert!(cond.meets(Some(&Value::from("192.168.4.20")), &req));
        assert!(cond.meets(Some(&Value::from("fd00::1")), &req));
        assert!(!cond.meets(Some(&Value::from("172.16.0.1")), &req));
    }

    #[test]
    fn test_null_value_never_meets() {
        let req = request();
        let ip = IpWhitelistCondition {
            networks: vec!["0.0.0.0/0".to_string()],
        };

        assert!(!BoolCondition { value: true }.meets(Some(&Value::Null), &req));
        assert!(!BoolCondition::default().meets(Some(&Value::Null), &req));
        assert!(!RoleEqualsCondition {}.meets(Some(&Value::Null), &req));
        assert!(!ip.meets(Some(&Value::Null), &req));
    }

    #[test]
    fn test_ip_whitelist_empty_networks() {
        let cond = IpWhitelistCondition::default();
        assert!(!cond.meets(Some(&Value::from("10.0.0.5")), &request()));
    }

    #[test]
    fn test_registry_builds_by_name_not_type() {
        let registry = ConditionRegistry::new();
        let conditions = registry
            .build(&[
                ConditionOptions::new("mfa", "bool").with_option("value", json!(true)),
                ConditionOptions::new("verified", "bool").with_option("value", json!(false)),
                ConditionOptions::new("remote_ip", "ip_whitelist")
                    .with_option("networks", json!(["10.0.0.0/8"])),
            ])
            .unwrap();

        assert_eq!(conditions.len(), 3);
        assert_eq!(conditions["mfa"].name(), "bool");
        assert_eq!(conditions["verified"].name(), "bool");
        assert_eq!(conditions["remote_ip"].name(), "ip_whitelist");

        let req = request();
        assert!(conditions["mfa"].meets(Some(&Value::Bool(true)), &req));
        assert!(conditions["verified"].meets(Some(&Value::Bool(false)), &req));
    }

    #[test]
    fn test_registry_skips_unknown_types() {
        let registry = ConditionRegistry::new();
        let conditions = registry
            .build(&[ConditionOptions::new("geo", "geo_fence")])
            .unwrap();
        assert!(conditions.is_empty());
    }

    #[test]
    fn test_registry_decode_failure_aborts() {
        let registry = ConditionRegistry::new();
        let err = registry
            .build(&[
                ConditionOptions::new("ok", "role_equals"),
                ConditionOptions::new("mfa", "bool").with_option("value", json!("yes")),
            ])
            .unwrap_err();

        match err {
            Error::ConditionDecode { name, kind, .. } => {
                assert_eq!(name, "mfa");
                assert_eq!(kind, "bool");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_registry_ignores_unknown_option_keys() {
        let registry = ConditionRegistry::new();
        let conditions = registry
            .build(&[ConditionOptions::new("mfa", "bool")
                .with_option("value", json!(true))
                .with_option("comment", json!("ignored"))])
            .unwrap();
        assert!(conditions["mfa"].meets(Some(&Value::Bool(true)), &request()));
    }

    #[test]
    fn test_registry_empty_options_use_defaults() {
        let registry = ConditionRegistry::new();
        let conditions = registry
            .build(&[ConditionOptions::new("remote_ip", "ip_whitelist")])
            .unwrap();
        assert!(!conditions["remote_ip"].meets(Some(&Value::from("10.0.0.1")), &request()));
    }

    #[derive(Debug, Default, Deserialize)]
    struct PrefixCondition {
        #[serde(default)]
        prefix: String,
    }

    impl Condition for PrefixCondition {
        fn name(&self) -> &str {
            Self::NAME
        }

        fn meets(&self, value: Option<&Value>, _request: &Request) -> bool {
            value
                .and_then(Value::as_str)
                .is_some_and(|s| s.starts_with(&self.prefix))
        }
    }

    impl ConditionKind for PrefixCondition {
        const NAME: &'static str = "prefix";
    }

    #[test]
    fn test_custom_condition_registration() {
        let mut registry = ConditionRegistry::new();
        assert!(!registry.contains("prefix"));
        registry.register_kind::<PrefixCondition>();
        assert!(registry.contains("prefix"));

        let conditions = registry
            .build(&[ConditionOptions::new("tenant", "prefix")
                .with_option("prefix", json!("acme-"))])
            .unwrap();

        let req = request();
        assert!(conditions["tenant"].meets(Some(&Value::from("acme-eu")), &req));
        assert!(!conditions["tenant"].meets(Some(&Value::from("globex")), &req));
    }

    #[test]
    fn test_condition_options_from_json() {
        let opts: Vec<ConditionOptions> = serde_json::from_value(json!([
            {"name": "remote_ip", "type": "ip_whitelist", "options": {"networks": ["10.0.0.0/24"]}},
            {"name": "owner", "type": "role_equals"}
        ]))
        .unwrap();

        assert_eq!(opts[0].kind, "ip_whitelist");
        assert!(opts[1].options.is_empty());

        let conditions = ConditionRegistry::new().build(&opts).unwrap();
        assert_eq!(conditions.len(), 2);
    }
}
