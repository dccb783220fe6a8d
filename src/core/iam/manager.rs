//! Policy storage
//!
//! The enforcer only needs [`PolicyManager::find_by_request`]. Managers may
//! return more candidates than strictly apply (the enforcer re-checks every
//! dimension) but must never omit a policy that applies.

use super::{ConditionRegistry, Policy, PolicyOptions, Request};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use tracing::debug;

/// Source of candidate policies for a request
pub trait PolicyManager: Send + Sync {
    /// Candidate policies for `request`, in evaluation order
    fn find_by_request(&self, request: &Request) -> anyhow::Result<Vec<Policy>>;
}

/// In-memory policy store preserving insertion order
#[derive(Debug, Default)]
pub struct MemoryPolicyManager {
    policies: RwLock<Vec<Policy>>,
}

impl MemoryPolicyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-constructed policies
    pub fn with_policies(policies: impl IntoIterator<Item = Policy>) -> Result<Self> {
        let manager = Self::new();
        for policy in policies {
            manager.create(policy)?;
        }
        Ok(manager)
    }

    /// Build and store policies from their declarative form
    pub fn load_options(
        &self,
        options: impl IntoIterator<Item = PolicyOptions>,
        registry: &ConditionRegistry,
    ) -> Result<usize> {
        let mut count = 0;
        for opts in options {
            self.create(Policy::from_options(opts, registry)?)?;
            count += 1;
        }
        debug!("Loaded {} policies", count);
        Ok(count)
    }

    pub fn create(&self, policy: Policy) -> Result<()> {
        let mut policies = self.policies.write();
        if policies.iter().any(|p| p.id() == policy.id()) {
            return Err(Error::DuplicatePolicy(policy.id().to_string()));
        }
        debug!("Creating policy {}", policy.id());
        policies.push(policy);
        Ok(())
    }

    /// Replace the stored policy with the same id, keeping its position
    pub fn update(&self, policy: Policy) -> Result<()> {
        let mut policies = self.policies.write();
        let slot = policies
            .iter_mut()
            .find(|p| p.id() == policy.id())
            .ok_or_else(|| Error::PolicyNotFound(policy.id().to_string()))?;
        debug!("Updating policy {}", policy.id());
        *slot = policy;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Policy> {
        self.policies
            .read()
            .iter()
            .find(|p| p.id() == id)
            .cloned()
            .ok_or_else(|| Error::PolicyNotFound(id.to_string()))
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let mut policies = self.policies.write();
        let index = policies
            .iter()
            .position(|p| p.id() == id)
            .ok_or_else(|| Error::PolicyNotFound(id.to_string()))?;
        debug!("Deleting policy {}", id);
        policies.remove(index);
        Ok(())
    }

    pub fn all(&self) -> Vec<Policy> {
        self.policies.read().clone()
    }

    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.read().is_empty()
    }

    /// Policies listing `role` verbatim among their role patterns
    pub fn find_by_role(&self, role: &str) -> Vec<Policy> {
        self.filter(|p| p.roles().iter().any(|r| r == role))
    }

    /// Policies listing `resource` verbatim among their resource patterns
    pub fn find_by_resource(&self, resource: &str) -> Vec<Policy> {
        self.filter(|p| p.resources().iter().any(|r| r == resource))
    }

    /// Policies listing `scope` verbatim among their scope patterns
    pub fn find_by_scope(&self, scope: &str) -> Vec<Policy> {
        self.filter(|p| p.scopes().iter().any(|s| s == scope))
    }

    fn filter(&self, pred: impl Fn(&Policy) -> bool) -> Vec<Policy> {
        self.policies
            .read()
            .iter()
            .filter(|p| pred(p))
            .cloned()
            .collect()
    }
}

impl PolicyManager for MemoryPolicyManager {
    /// Every stored policy; patterns are left to the matcher
    fn find_by_request(&self, _request: &Request) -> anyhow::Result<Vec<Policy>> {
        Ok(self.all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::iam::Effect;

    fn policy(id: &str, effect: Effect) -> Policy {
        Policy::builder(id, effect)
            .actions(["read"])
            .roles(["admin"])
            .resources(["doc1"])
            .scopes(["default"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let manager = MemoryPolicyManager::new();
        assert!(manager.is_empty());

        manager.create(policy("p1", Effect::Allow)).unwrap();
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.get("p1").unwrap().effect(), Effect::Allow);
        assert!(matches!(manager.get("nope"), Err(Error::PolicyNotFound(_))));
    }

    #[test]
    fn test_duplicate_create() {
        let manager = MemoryPolicyManager::new();
        manager.create(policy("p1", Effect::Allow)).unwrap();
        assert!(matches!(
            manager.create(policy("p1", Effect::Deny)),
            Err(Error::DuplicatePolicy(id)) if id == "p1"
        ));
    }

    #[test]
    fn test_update_keeps_position() {
        let manager =
            MemoryPolicyManager::with_policies([policy("p1", Effect::Allow), policy("p2", Effect::Allow)])
                .unwrap();

        manager.update(policy("p1", Effect::Deny)).unwrap();
        let all = manager.all();
        assert_eq!(all[0].id(), "p1");
        assert_eq!(all[0].effect(), Effect::Deny);

        assert!(matches!(
            manager.update(policy("p3", Effect::Deny)),
            Err(Error::PolicyNotFound(_))
        ));
    }

    #[test]
    fn test_delete() {
        let manager = MemoryPolicyManager::with_policies([policy("p1", Effect::Allow)]).unwrap();
        manager.delete("p1").unwrap();
        assert!(manager.is_empty());
        assert!(manager.delete("p1").is_err());
    }

    #[test]
    fn test_find_by_request_returns_insertion_order() {
        let manager = MemoryPolicyManager::with_policies([
            policy("b", Effect::Allow),
            policy("a", Effect::Deny),
            policy("c", Effect::Allow),
        ])
        .unwrap();

        let req = Request::new("guest", "write", "other", "none");
        let ids: Vec<String> = manager
            .find_by_request(&req)
            .unwrap()
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn test_find_by_dimension() {
        let other = Policy::builder("p2", Effect::Allow)
            .roles(["editor"])
            .resources(["doc2"])
            .scopes(["tenant-a"])
            .build()
            .unwrap();
        let manager = MemoryPolicyManager::with_policies([policy("p1", Effect::Allow), other]).unwrap();

        assert_eq!(manager.find_by_role("editor")[0].id(), "p2");
        assert_eq!(manager.find_by_resource("doc1")[0].id(), "p1");
        assert_eq!(manager.find_by_scope("tenant-a").len(), 1);
        assert!(manager.find_by_role("nobody").is_empty());
    }

    #[test]
    fn test_load_options() {
        let set = crate::core::iam::PolicySet::from_json(
            r#"{"policies": [
                {"id": "p1", "effect": "allow", "actions": ["read"]},
                {"id": "p2", "effect": "deny", "actions": ["delete"]}
            ]}"#,
        )
        .unwrap();

        let manager = MemoryPolicyManager::new();
        let loaded = manager
            .load_options(set.policies, &ConditionRegistry::new())
            .unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(manager.get("p2").unwrap().effect(), Effect::Deny);
    }
}
