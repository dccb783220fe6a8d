//! Policy enforcement with deny precedence
//!
//! Candidate policies are checked dimension by dimension:
//! action, role, resource, scope, then conditions.
//! - A matching Deny policy ends evaluation immediately
//! - A matching Allow policy is remembered, evaluation continues
//! - No matching Allow falls back to the configured default effect

use super::{GlobMatcher, Matcher, Policy, PolicyManager, Request};
use crate::core::audit::{AuditRecord, Auditor};
use crate::core::config::EnforcerConfig;
use crate::core::iam::Effect;
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::{debug, trace};

/// Authorization decision point
///
/// Holds shared references to its collaborators and no per-call state, so
/// one instance can serve concurrent callers.
#[derive(Clone)]
pub struct Enforcer {
    manager: Arc<dyn PolicyManager>,
    matcher: Arc<dyn Matcher>,
    auditor: Option<Arc<dyn Auditor>>,
    config: EnforcerConfig,
}

impl Enforcer {
    pub fn new(
        manager: Arc<dyn PolicyManager>,
        matcher: Arc<dyn Matcher>,
        auditor: Option<Arc<dyn Auditor>>,
        config: EnforcerConfig,
    ) -> Self {
        Enforcer {
            manager,
            matcher,
            auditor,
            config,
        }
    }

    /// Enforcer with the glob matcher, no auditor and a Deny default
    pub fn with_defaults(manager: Arc<dyn PolicyManager>) -> Self {
        Self::new(
            manager,
            Arc::new(GlobMatcher::new()),
            None,
            EnforcerConfig::default(),
        )
    }

    pub fn config(&self) -> &EnforcerConfig {
        &self.config
    }

    /// Decide whether `request` is permitted
    ///
    /// `Ok(())` means allowed. Denials come back as
    /// [`Error::DeniedExplicit`] or [`Error::DeniedImplicit`]; any other
    /// error is an infrastructure failure from the policy manager or matcher.
    ///
    /// # Examples
    /// ```
    /// use gatekeeper::{Effect, Enforcer, MemoryPolicyManager, Policy, Request};
    /// use std::sync::Arc;
    ///
    /// let manager = MemoryPolicyManager::with_policies([
    ///     Policy::builder("p1", Effect::Allow)
    ///         .actions(["read"])
    ///         .roles(["admin"])
    ///         .resources(["*"])
    ///         .scopes(["default"])
    ///         .build()
    ///         .unwrap(),
    /// ])
    /// .unwrap();
    ///
    /// let enforcer = Enforcer::with_defaults(Arc::new(manager));
    /// assert!(enforcer.enforce(&Request::new("admin", "read", "doc1", "default")).is_ok());
    ///
    /// let err = enforcer
    ///     .enforce(&Request::new("guest", "read", "doc1", "default"))
    ///     .unwrap_err();
    /// assert!(err.is_implicit_denial());
    /// ```
    pub fn enforce(&self, request: &Request) -> Result<()> {
        debug!(
            "Enforcing {} on {} (role {}, scope {})",
            request.action, request.resource, request.role, request.scope
        );

        let policies = self
            .manager
            .find_by_request(request)
            .map_err(Error::Manager)?;

        let mut allowed = false;
        let mut matched = Vec::new();

        for policy in &policies {
            if !self.eval_policy(request, policy)? {
                continue;
            }

            matched.push(policy.id().to_string());

            // Deny overrides everything
            if policy.effect() == Effect::Deny {
                debug!("Request denied by policy {}", policy.id());
                self.audit(request, matched, Effect::Deny, true);
                return Err(Error::DeniedExplicit {
                    policy_id: policy.id().to_string(),
                });
            }

            allowed = true;
        }

        if !allowed && self.config.default_effect == Effect::Deny {
            debug!("Request denied: no policy allowed access");
            self.audit(request, matched, Effect::Deny, false);
            return Err(Error::DeniedImplicit);
        }

        debug!("Request allowed ({} matching policies)", matched.len());
        self.audit(request, matched, Effect::Allow, false);
        Ok(())
    }

    /// Like [`enforce`](Self::enforce), but folds denials into an [`Effect`]
    ///
    /// Infrastructure failures are still returned as errors.
    pub fn decide(&self, request: &Request) -> Result<Effect> {
        match self.enforce(request) {
            Ok(()) => Ok(Effect::Allow),
            Err(e) if e.is_denied() => Ok(Effect::Deny),
            Err(e) => Err(e),
        }
    }

    /// Check one policy against the request
    fn eval_policy(&self, request: &Request, policy: &Policy) -> Result<bool> {
        if !self
            .matcher
            .match_policy(policy, policy.actions(), &request.action)?
        {
            trace!("Policy {} skipped: action", policy.id());
            return Ok(false);
        }

        if !self.match_roles(request, policy)? {
            trace!("Policy {} skipped: role", policy.id());
            return Ok(false);
        }

        if !self
            .matcher
            .match_policy(policy, policy.resources(), &request.resource)?
        {
            trace!("Policy {} skipped: resource", policy.id());
            return Ok(false);
        }

        if !self
            .matcher
            .match_policy(policy, policy.scopes(), &request.scope)?
        {
            trace!("Policy {} skipped: scope", policy.id());
            return Ok(false);
        }

        if !check_conditions(request, policy) {
            trace!("Policy {} skipped: conditions", policy.id());
            return Ok(false);
        }

        Ok(true)
    }

    /// Any single role pattern is enough
    fn match_roles(&self, request: &Request, policy: &Policy) -> Result<bool> {
        for pattern in policy.roles() {
            if self.matcher.match_role(pattern, &request.role)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn audit(&self, request: &Request, matched: Vec<String>, effect: Effect, explicit: bool) {
        if let Some(auditor) = &self.auditor {
            auditor.record(&AuditRecord::new(request, matched, effect, explicit));
        }
    }
}

/// Every condition must hold for its metadata value
fn check_conditions(request: &Request, policy: &Policy) -> bool {
    policy
        .conditions()
        .iter()
        .all(|(key, cond)| cond.meets(request.metadata.get(key), request))
}

impl std::fmt::Debug for Enforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enforcer")
            .field("auditor", &self.auditor.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
