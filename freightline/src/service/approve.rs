//! Manual approval of Freight for a Stage.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::validation::{require, FreightRef};
use super::{traced, FreightService};
use crate::auth::VERB_PROMOTE;
use crate::core::{Freight, Resource, Stage};
use crate::errors::Result;
use crate::store::patch_status;

/// Request to approve a Freight for one Stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApproveFreightRequest {
    /// Project (namespace) of both objects.
    pub project: String,
    /// Freight name. Exclusive with `alias`.
    pub name: String,
    /// Freight alias. Exclusive with `name`.
    pub alias: String,
    /// Stage the Freight is approved for.
    pub stage: String,
}

impl ApproveFreightRequest {
    /// Request identifying the Freight by name.
    #[must_use]
    pub fn by_name(
        project: impl Into<String>,
        name: impl Into<String>,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
            stage: stage.into(),
            ..Default::default()
        }
    }

    /// Request identifying the Freight by alias.
    #[must_use]
    pub fn by_alias(
        project: impl Into<String>,
        alias: impl Into<String>,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            alias: alias.into(),
            stage: stage.into(),
            ..Default::default()
        }
    }
}

impl FreightService {
    /// Approves a Freight for a Stage.
    ///
    /// Approval is monotonic: approving an already-approved pair succeeds
    /// without writing. Otherwise only the Freight's status is patched, guarded
    /// by the version that was read.
    pub async fn approve_freight(&self, req: &ApproveFreightRequest) -> Result<Freight> {
        traced("approve_freight", &req.project, self.approve_freight_inner(req)).await
    }

    async fn approve_freight_inner(&self, req: &ApproveFreightRequest) -> Result<Freight> {
        require("project", &req.project)?;
        let freight_ref = FreightRef::from_name_or_alias(&req.name, &req.alias)?;
        require("stage", &req.stage)?;

        self.validate_project_exists(&req.project).await?;
        let freight = self.get_freight(&req.project, &freight_ref).await?;
        let stage = self.get_stage(&req.project, &req.stage).await?;

        self.authorizer()
            .authorize(VERB_PROMOTE, &Stage::gvr(), "", &stage.key())
            .await?;

        if freight.status.is_approved_for(&req.stage) {
            debug!(freight = %freight.name(), stage = %req.stage, "freight already approved");
            return Ok(freight);
        }

        let stage_name = req.stage.clone();
        let approved = patch_status(self.store(), &freight, move |status| {
            status.approve(stage_name);
        })
        .await?;
        info!(freight = %approved.name(), stage = %req.stage, "approved freight for stage");
        Ok(approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockAuthorizer;
    use crate::core::{DynamicObject, ObjectKey, API_VERSION};
    use crate::errors::{ErrorCode, FreightlineError};
    use crate::service::ServicePorts;
    use crate::store::ResourceStore;
    use pretty_assertions::assert_eq;
    use crate::testing::{Fixture, PROJECT};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_authorizes_promote_on_target_stage() {
        let fixture = Fixture::pipeline().unwrap();
        let mut authz = MockAuthorizer::new();
        authz
            .expect_authorize()
            .withf(|verb, gvr, subresource, key| {
                verb == VERB_PROMOTE
                    && *gvr == Stage::gvr()
                    && subresource.is_empty()
                    && key.name == "uat"
                    && key.namespace == PROJECT
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let svc = FreightService::new(
            ServicePorts::new(fixture.store.clone()).with_authorizer(Arc::new(authz)),
        );
        let freight = svc
            .approve_freight(&ApproveFreightRequest::by_name(PROJECT, "f-verified", "uat"))
            .await
            .unwrap();
        assert!(freight.status.is_approved_for("uat"));
        assert!(freight.status.is_verified_in("test"));
    }

    #[tokio::test]
    async fn test_denial_prevents_write() {
        let fixture = Fixture::pipeline().unwrap();
        let mut authz = MockAuthorizer::new();
        authz
            .expect_authorize()
            .returning(|_, _, _, _| Err(FreightlineError::permission_denied("nope")));

        let svc = FreightService::new(
            ServicePorts::new(fixture.store.clone()).with_authorizer(Arc::new(authz)),
        );
        let err = svc
            .approve_freight(&ApproveFreightRequest::by_alias(PROJECT, "mighty-mouse", "uat"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);

        let stored = svc
            .get_freight(PROJECT, &FreightRef::Name("f-verified".into()))
            .await
            .unwrap();
        assert!(!stored.status.is_approved_for("uat"));
    }

    #[tokio::test]
    async fn test_approval_preserves_status_written_by_others() {
        let fixture = Fixture::pipeline().unwrap();
        let status = serde_json::json!({
            "approvedFor": {"test": {"approvedAt": "2024-01-01T00:00:00Z", "by": "alice"}},
            "verifiedIn": {"test": {"verifiedAt": "2024-01-02T03:04:05Z", "id": "v-123"}},
            "currentlyIn": {"qa": {}}
        });
        let rich = DynamicObject::from_value(serde_json::json!({
            "apiVersion": API_VERSION,
            "kind": Freight::KIND,
            "metadata": {"name": "f-rich", "namespace": PROJECT},
            "status": status.clone(),
        }))
        .unwrap();
        fixture.store.create(rich).await.unwrap();

        let svc = FreightService::new(ServicePorts::new(fixture.store.clone()));
        svc.approve_freight(&ApproveFreightRequest::by_name(PROJECT, "f-rich", "uat"))
            .await
            .unwrap();

        let stored = fixture
            .store
            .get(Freight::KIND, &ObjectKey::new(PROJECT, "f-rich"))
            .await
            .unwrap();
        let mut expected = status;
        expected["approvedFor"]["uat"] = serde_json::json!({});
        assert_eq!(stored.field("status"), Some(&expected));
    }

    #[tokio::test]
    async fn test_missing_stage_is_not_found() {
        let fixture = Fixture::pipeline().unwrap();
        let svc = FreightService::new(ServicePorts::new(fixture.store.clone()));
        let err = svc
            .approve_freight(&ApproveFreightRequest::by_name(PROJECT, "f-verified", "nope"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_empty_fields_rejected() {
        let fixture = Fixture::pipeline().unwrap();
        let svc = FreightService::new(ServicePorts::new(fixture.store.clone()));
        for req in [
            ApproveFreightRequest::by_name("", "f-verified", "uat"),
            ApproveFreightRequest::by_name(PROJECT, "f-verified", ""),
        ] {
            let err = svc.approve_freight(&req).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidArgument);
        }
    }
}
