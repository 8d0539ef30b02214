//! Promotion of verified Freight to every direct subscriber of a Stage.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::validation::{require, FreightRef};
use super::{traced, FreightService};
use crate::auth::VERB_PROMOTE;
use crate::availability::is_freight_available;
use crate::core::{Promotion, Resource, Stage};
use crate::errors::{AggregateError, FreightlineError, Result};
use crate::store::create_object;

/// Request to promote a Freight from a Stage to all of its subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PromoteSubscribersRequest {
    /// Project (namespace) of the Stage and Freight.
    pub project: String,
    /// Source Stage.
    pub stage: String,
    /// Freight name. Exclusive with `freight_alias`.
    pub freight: String,
    /// Freight alias. Exclusive with `freight`.
    pub freight_alias: String,
}

impl PromoteSubscribersRequest {
    /// Request identifying the Freight by name.
    #[must_use]
    pub fn new(
        project: impl Into<String>,
        stage: impl Into<String>,
        freight: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            stage: stage.into(),
            freight: freight.into(),
            ..Default::default()
        }
    }

    /// Identifies the Freight by alias instead of name.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.freight_alias = alias.into();
        self
    }
}

/// Result of a fan-out that got past validation and authorization.
///
/// `promotions` holds every Promotion created, in subscriber order. `error`
/// aggregates every creation that failed; when it is set the fan-out was
/// partially applied.
#[derive(Debug)]
pub struct PromoteSubscribersOutcome {
    /// Created Promotions, in subscriber order.
    pub promotions: Vec<Promotion>,
    /// Aggregate of all creation failures, if any.
    pub error: Option<FreightlineError>,
}

impl PromoteSubscribersOutcome {
    /// Returns true if every subscriber received a Promotion.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Converts a partial outcome into its aggregate error.
    pub fn into_result(self) -> Result<Vec<Promotion>> {
        match self.error {
            None => Ok(self.promotions),
            Some(err) => Err(err),
        }
    }
}

impl FreightService {
    /// Creates a Promotion of a verified Freight for every Stage subscribed
    /// to the source Stage.
    ///
    /// Validation, lookup, availability and authorization failures reject
    /// the whole request before anything is written. Authorization is checked
    /// for every subscriber up front. Each creation is then attempted
    /// regardless of the others.
    pub async fn promote_subscribers(
        &self,
        req: &PromoteSubscribersRequest,
    ) -> Result<PromoteSubscribersOutcome> {
        traced(
            "promote_subscribers",
            &req.project,
            self.promote_subscribers_inner(req),
        )
        .await
    }

    async fn promote_subscribers_inner(
        &self,
        req: &PromoteSubscribersRequest,
    ) -> Result<PromoteSubscribersOutcome> {
        require("project", &req.project)?;
        require("stage", &req.stage)?;
        let freight_ref = FreightRef::from_name_or_alias(&req.freight, &req.freight_alias)?;

        self.validate_project_exists(&req.project).await?;
        let stage = self.get_stage(&req.project, &req.stage).await?;
        let freight = self.get_freight(&req.project, &freight_ref).await?;

        // Approval for the source Stage does not carry over to its subscribers.
        if !is_freight_available(&freight, "", &[req.stage.as_str()]) {
            return Err(FreightlineError::invalid_argument(format!(
                "Freight {:?} is not available to Stage {:?}",
                freight.name(),
                req.stage
            )));
        }

        let subscribers = self.find_stage_subscribers(&stage).await?;
        if subscribers.is_empty() {
            return Err(FreightlineError::not_found(format!(
                "stage {:?} has no subscribers",
                req.stage
            )));
        }

        for subscriber in &subscribers {
            self.authorizer()
                .authorize(VERB_PROMOTE, &Stage::gvr(), "", &subscriber.key())
                .await?;
        }

        let outcome = self.create_promotions(&subscribers, freight.name()).await;
        if outcome.is_complete() {
            info!(
                stage = %req.stage,
                freight = %freight.name(),
                promotions = outcome.promotions.len(),
                "promoted freight to subscribers"
            );
        } else {
            warn!(
                stage = %req.stage,
                freight = %freight.name(),
                created = outcome.promotions.len(),
                subscribers = subscribers.len(),
                "promotion fan-out partially failed"
            );
        }
        Ok(outcome)
    }

    async fn create_promotions(
        &self,
        subscribers: &[Stage],
        freight: &str,
    ) -> PromoteSubscribersOutcome {
        let store = self.store();
        let prefix_max = self.config.promotion_name_prefix_max;

        let results: Vec<Result<Promotion>> = stream::iter(subscribers)
            .map(|subscriber| {
                let promotion = Promotion::for_stage(subscriber, freight, prefix_max);
                async move {
                    create_object(store, &promotion).await.map_err(|e| {
                        FreightlineError::Internal(format!(
                            "error creating Promotion for Stage {:?} in namespace {:?}: {e}",
                            subscriber.name(),
                            subscriber.namespace()
                        ))
                    })
                }
            })
            .buffered(self.config.fan_out_concurrency.max(1))
            .collect()
            .await;

        let mut promotions = Vec::with_capacity(results.len());
        let mut errors = AggregateError::new();
        for result in results {
            match result {
                Ok(promotion) => promotions.push(promotion),
                Err(err) => errors.push(err),
            }
        }
        PromoteSubscribersOutcome {
            promotions,
            error: errors.into_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::service::ServicePorts;
    use crate::testing::{assert_error_code, Fixture, RecordingAuthorizer, PROJECT};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_promotes_all_subscribers_in_order() {
        let fixture = Fixture::pipeline().unwrap();
        let svc = FreightService::new(ServicePorts::new(fixture.store.clone()));

        let outcome = svc
            .promote_subscribers(&PromoteSubscribersRequest::new(PROJECT, "test", "f-verified"))
            .await
            .unwrap();
        assert!(outcome.is_complete());
        let targets: Vec<&str> = outcome
            .promotions
            .iter()
            .map(|p| p.spec.stage.as_str())
            .collect();
        assert_eq!(targets, vec!["qa", "staging", "uat"]);
        for promotion in &outcome.promotions {
            assert_eq!(promotion.spec.freight, "f-verified");
            assert_eq!(promotion.metadata.namespace, PROJECT);
            assert!(promotion.metadata.resource_version.is_some());
        }
    }

    #[tokio::test]
    async fn test_alias_resolution() {
        let fixture = Fixture::pipeline().unwrap();
        let svc = FreightService::new(ServicePorts::new(fixture.store.clone()));
        let outcome = svc
            .promote_subscribers(
                &PromoteSubscribersRequest::new(PROJECT, "test", "").with_alias("mighty-mouse"),
            )
            .await
            .unwrap();
        assert_eq!(outcome.promotions.len(), 3);
    }

    #[tokio::test]
    async fn test_first_denial_aborts_before_any_write() {
        let fixture = Fixture::pipeline().unwrap();
        let authz = Arc::new(RecordingAuthorizer::new().deny("staging"));
        let svc = FreightService::new(
            ServicePorts::new(fixture.store.clone()).with_authorizer(authz.clone()),
        );

        let result = svc
            .promote_subscribers(&PromoteSubscribersRequest::new(PROJECT, "test", "f-verified"))
            .await;
        let err = assert_error_code(result, ErrorCode::PermissionDenied);
        assert!(err.to_string().contains("staging"));

        let checked: Vec<String> = authz.calls().into_iter().map(|(_, k)| k.name).collect();
        assert_eq!(checked, vec!["qa", "staging"]);
        assert_eq!(fixture.store.count(Promotion::KIND), 0);
    }

    #[tokio::test]
    async fn test_missing_freight() {
        let fixture = Fixture::pipeline().unwrap();
        let svc = FreightService::new(ServicePorts::new(fixture.store.clone()));
        let result = svc
            .promote_subscribers(&PromoteSubscribersRequest::new(PROJECT, "test", "nope"))
            .await;
        assert_error_code(result, ErrorCode::NotFound);
    }

    #[test]
    fn test_outcome_into_result() {
        let outcome = PromoteSubscribersOutcome {
            promotions: vec![],
            error: Some(FreightlineError::Internal("x".into())),
        };
        assert!(outcome.into_result().is_err());
    }
}
