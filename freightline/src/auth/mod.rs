//! Authorization call contract.
//!
//! The service asks an [`Authorizer`] before every state-mutating effect.
//! How the decision is made (RBAC, tokens, policy engines) is the
//! authorizer's business; the service only propagates the outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{GroupVersionResource, ObjectKey};
use crate::errors::{FreightlineError, Result};

/// The verb checked before creating Promotions or approving Freight.
pub const VERB_PROMOTE: &str = "promote";

/// The verb checked before creating each object of a manifest.
pub const VERB_CREATE: &str = "create";

/// Decides whether the caller may perform an action on an object.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Returns `Ok(())` to allow, or an error (normally
    /// [`FreightlineError::PermissionDenied`]) to deny.
    async fn authorize(
        &self,
        verb: &str,
        gvr: &GroupVersionResource,
        subresource: &str,
        key: &ObjectKey,
    ) -> Result<()>;
}

/// Grants everything. Suitable for single-user and test deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(
        &self,
        _verb: &str,
        _gvr: &GroupVersionResource,
        _subresource: &str,
        _key: &ObjectKey,
    ) -> Result<()> {
        Ok(())
    }
}

/// One allow rule. Empty fields and `"*"` match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Verb, e.g. `promote`.
    #[serde(default)]
    pub verb: String,
    /// Plural resource, e.g. `stages`.
    #[serde(default)]
    pub resource: String,
    /// Namespace.
    #[serde(default)]
    pub namespace: String,
    /// Object name.
    #[serde(default)]
    pub name: String,
}

impl PolicyRule {
    /// Creates a rule allowing `verb` on `resource`.
    #[must_use]
    pub fn allow(verb: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            resource: resource.into(),
            ..Default::default()
        }
    }

    /// Restricts the rule to a namespace.
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Restricts the rule to a single object.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn matches(&self, verb: &str, gvr: &GroupVersionResource, key: &ObjectKey) -> bool {
        fn field(pattern: &str, value: &str) -> bool {
            pattern.is_empty() || pattern == "*" || pattern == value
        }
        field(&self.verb, verb)
            && field(&self.resource, &gvr.resource)
            && field(&self.namespace, &key.namespace)
            && field(&self.name, &key.name)
    }
}

/// Allows an action only if some rule matches it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyAuthorizer {
    rules: Vec<PolicyRule>,
}

impl PolicyAuthorizer {
    /// Creates an authorizer with no rules (denies everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: PolicyRule) -> Self {
        self.rules.push(rule);
        self
    }
}

#[async_trait]
impl Authorizer for PolicyAuthorizer {
    async fn authorize(
        &self,
        verb: &str,
        gvr: &GroupVersionResource,
        subresource: &str,
        key: &ObjectKey,
    ) -> Result<()> {
        if self.rules.iter().any(|r| r.matches(verb, gvr, key)) {
            return Ok(());
        }
        debug!(verb, resource = %gvr.resource, key = %key, "authorization denied");
        let resource = if subresource.is_empty() {
            gvr.resource.clone()
        } else {
            format!("{}/{subresource}", gvr.resource)
        };
        Err(FreightlineError::permission_denied(format!(
            "not allowed to {verb} {resource} {key:?}",
            key = key.to_string()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use tokio_test::{assert_err, assert_ok};

    fn stages() -> GroupVersionResource {
        GroupVersionResource::freightline("stages")
    }

    #[tokio::test]
    async fn test_allow_all() {
        assert_ok!(
            AllowAll
                .authorize(VERB_PROMOTE, &stages(), "", &ObjectKey::new("p", "dev"))
                .await
        );
    }

    #[tokio::test]
    async fn test_policy_authorizer_scopes() {
        let authz = PolicyAuthorizer::new()
            .with_rule(PolicyRule::allow(VERB_PROMOTE, "stages").in_namespace("p").named("dev"))
            .with_rule(PolicyRule::allow("*", "stages").in_namespace("sandbox"));

        assert_ok!(
            authz
                .authorize(VERB_PROMOTE, &stages(), "", &ObjectKey::new("p", "dev"))
                .await
        );
        assert_ok!(
            authz
                .authorize(VERB_PROMOTE, &stages(), "", &ObjectKey::new("sandbox", "any"))
                .await
        );

        let denied = authz
            .authorize(VERB_PROMOTE, &stages(), "", &ObjectKey::new("p", "prod"))
            .await;
        let err = assert_err!(denied);
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
        assert!(err.to_string().contains("p/prod"));
    }

    #[tokio::test]
    async fn test_empty_policy_denies() {
        let res = PolicyAuthorizer::new()
            .authorize(VERB_PROMOTE, &stages(), "", &ObjectKey::new("p", "dev"))
            .await;
        assert_err!(res);
    }
}
