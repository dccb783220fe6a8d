#![no_main]
use arbitrary::Arbitrary;
use gatekeeper::{Effect, Enforcer, MemoryPolicyManager, Policy, Request};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

#[derive(Debug, Arbitrary)]
struct FuzzPolicy {
    deny: bool,
    actions: Vec<String>,
    roles: Vec<String>,
    resources: Vec<String>,
    scopes: Vec<String>,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    policies: Vec<FuzzPolicy>,
    role: String,
    action: String,
    resource: String,
    scope: String,
}

fuzz_target!(|input: FuzzInput| {
    let manager = MemoryPolicyManager::new();
    let mut any_deny = false;
    for (i, p) in input.policies.into_iter().take(16).enumerate() {
        let effect = if p.deny { Effect::Deny } else { Effect::Allow };
        any_deny |= p.deny;
        let policy = Policy::builder(format!("p{}", i), effect)
            .actions(p.actions)
            .roles(p.roles)
            .resources(p.resources)
            .scopes(p.scopes)
            .build();
        if let Ok(policy) = policy {
            let _ = manager.create(policy);
        }
    }

    let enforcer = Enforcer::with_defaults(Arc::new(manager));
    let req = Request::new(input.role, input.action, input.resource, input.scope);

    // Explicit denials can only come from Deny policies
    if let Err(err) = enforcer.enforce(&req) {
        if err.is_explicit_denial() {
            assert!(any_deny);
        }
    }
});
