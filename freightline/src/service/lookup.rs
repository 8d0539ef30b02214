//! Object lookups shared by the service operations.

use tracing::debug;

use super::validation::FreightRef;
use super::FreightService;
use crate::core::{Freight, ObjectKey, Project, Resource, Stage};
use crate::errors::{FreightlineError, Result};
use crate::graph;
use crate::store::{get_object, list_objects};

impl FreightService {
    /// Fails with `NotFound` unless the cluster-scoped Project exists.
    pub async fn validate_project_exists(&self, project: &str) -> Result<()> {
        match get_object::<Project>(self.store(), &ObjectKey::cluster(project)).await? {
            Some(_) => Ok(()),
            None => Err(FreightlineError::not_found(format!(
                "project {project:?} not found"
            ))),
        }
    }

    /// Fetches a Stage, failing with `NotFound` if it is absent.
    pub async fn get_stage(&self, project: &str, name: &str) -> Result<Stage> {
        get_object::<Stage>(self.store(), &ObjectKey::new(project, name))
            .await?
            .ok_or_else(|| {
                FreightlineError::not_found(format!(
                    "{} {name:?} not found in namespace {project:?}",
                    Stage::KIND
                ))
            })
    }

    /// Fetches a Freight by name or alias, failing with `NotFound` if absent.
    pub async fn get_freight(&self, project: &str, freight: &FreightRef) -> Result<Freight> {
        let found = match freight {
            FreightRef::Name(name) => {
                get_object::<Freight>(self.store(), &ObjectKey::new(project, name.as_str())).await?
            }
            FreightRef::Alias(alias) => list_objects::<Freight>(self.store(), project)
                .await?
                .into_iter()
                .find(|f| f.alias.as_deref() == Some(alias.as_str())),
        };
        found.ok_or_else(|| freight.not_found(project))
    }

    /// Returns the Stages in `stage`'s namespace that subscribe directly to it.
    ///
    /// Lists every Stage in the namespace on each call. An empty result is not
    /// an error.
    pub async fn find_stage_subscribers(&self, stage: &Stage) -> Result<Vec<Stage>> {
        let stages = list_objects::<Stage>(self.store(), &stage.metadata.namespace).await?;
        let subscribers = graph::direct_subscribers(&stage.metadata.name, &stages);
        debug!(
            stage = %stage.metadata.name,
            scanned = stages.len(),
            subscribers = subscribers.len(),
            "resolved stage subscribers"
        );
        Ok(subscribers)
    }
}
