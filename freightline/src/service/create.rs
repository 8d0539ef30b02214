//! Bulk creation of resources from a manifest.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{traced, FreightService};
use crate::auth::VERB_CREATE;
use crate::core::DynamicObject;
use crate::errors::{FreightlineError, Result};
use crate::manifest;

/// Outcome of creating one object.
#[derive(Debug)]
pub enum CreateOutcome {
    /// The canonical stored form.
    Created(DynamicObject),
    /// The creation failed.
    Failed {
        /// Kind of the object that failed.
        kind: String,
        /// Name of the object that failed.
        name: String,
        /// Why.
        error: FreightlineError,
    },
}

impl CreateOutcome {
    /// Returns true if the object was created.
    #[must_use]
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// One entry of a `create_resource` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreateResourceResult {
    /// The created object, marshalled as YAML.
    CreatedResourceManifest(String),
    /// Error text for an object that could not be created.
    Error(String),
}

impl FreightService {
    /// Creates `projects` first, then `others`, attempting every object.
    ///
    /// Each object is authorized for `create` on its own; a denial fails only
    /// that object.
    ///
    /// The result order is all projects in their given order followed by all
    /// other objects in theirs. One failure never stops the rest.
    pub async fn create_all(
        &self,
        projects: Vec<DynamicObject>,
        others: Vec<DynamicObject>,
    ) -> Vec<CreateOutcome> {
        let mut outcomes = Vec::with_capacity(projects.len() + others.len());
        for obj in projects.into_iter().chain(others) {
            outcomes.push(self.create_one(obj).await);
        }
        outcomes
    }

    async fn create_one(&self, obj: DynamicObject) -> CreateOutcome {
        let kind = obj.kind.clone();
        let name = obj.metadata.name.clone();
        if let Err(error) = self
            .authorizer()
            .authorize(VERB_CREATE, &obj.gvr(), "", &obj.key())
            .await
        {
            warn!(kind = %kind, name = %name, error = %error, "not allowed to create resource");
            return CreateOutcome::Failed { kind, name, error };
        }
        match self.store().create(obj).await {
            Ok(created) => {
                debug!(kind = %kind, name = %name, "created resource");
                CreateOutcome::Created(created)
            }
            Err(e) => {
                warn!(kind = %kind, name = %name, error = %e, "failed to create resource");
                let error = FreightlineError::store(format!("create {}", kind.to_lowercase()), e);
                CreateOutcome::Failed { kind, name, error }
            }
        }
    }

    /// Parses a multi-document manifest and creates every object in it.
    ///
    /// A parse error rejects the whole manifest. Otherwise each result is
    /// the created object as YAML, or the error text for that object.
    pub async fn create_resource(&self, text: &str) -> Result<Vec<CreateResourceResult>> {
        traced("create_resource", "", self.create_resource_inner(text)).await
    }

    async fn create_resource_inner(&self, text: &str) -> Result<Vec<CreateResourceResult>> {
        let (projects, others) = manifest::split_yaml(text)?;
        let outcomes = self.create_all(projects, others).await;
        Ok(outcomes.into_iter().map(to_result).collect())
    }
}

fn to_result(outcome: CreateOutcome) -> CreateResourceResult {
    match outcome {
        CreateOutcome::Created(obj) => match manifest::to_yaml(&obj) {
            Ok(yaml) => CreateResourceResult::CreatedResourceManifest(yaml),
            Err(e) => CreateResourceResult::Error(format!("marshal created manifest: {e}")),
        },
        CreateOutcome::Failed { error, .. } => {
            CreateResourceResult::Error(format!("create resource: {error}"))
        }
    }
}
