//! Promotion: a work item asking a Stage to move to a Freight.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::meta::{ObjectMeta, OwnerReference, API_VERSION};
use super::resource::{HasStatus, Resource};
use super::stage::Stage;

/// Longest name the store accepts for any object.
pub const MAX_OBJECT_NAME_LEN: usize = 253;

/// Length of the Freight name fragment embedded in Promotion names.
const SHORT_FREIGHT_LEN: usize = 7;

/// Length of the simple-format uuid embedded in Promotion names.
const UNIQUE_ID_LEN: usize = 32;

/// Default cap on the Stage-name prefix, leaving room for the id and Freight suffix.
pub const DEFAULT_STAGE_PREFIX_MAX: usize =
    MAX_OBJECT_NAME_LEN - 1 - UNIQUE_ID_LEN - 1 - SHORT_FREIGHT_LEN;

/// Desired transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionSpec {
    /// Target Stage name.
    pub stage: String,
    /// Freight name to promote.
    pub freight: String,
}

/// Lifecycle phase, set by the controller that executes Promotions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromotionPhase {
    /// Waiting to run.
    Pending,
    /// Being executed.
    Running,
    /// Completed successfully.
    Succeeded,
    /// Completed unsuccessfully.
    Failed,
    /// Could not be executed.
    Errored,
}

impl fmt::Display for PromotionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Running => write!(f, "Running"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
            Self::Errored => write!(f, "Errored"),
        }
    }
}

/// Observed state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionStatus {
    /// Current phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<PromotionPhase>,
    /// Human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A request that a Stage transition to the state represented by a Freight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Desired transition.
    #[serde(default)]
    pub spec: PromotionSpec,
    /// Observed state.
    #[serde(default)]
    pub status: PromotionStatus,
}

impl Promotion {
    /// Builds a new Promotion of `freight` into `stage`.
    ///
    /// The Promotion lives in the Stage's namespace, is controller-owned by
    /// the Stage and is named `<stage>.<unique id>.<freight prefix>`, with the
    /// Stage part truncated to `stage_prefix_max` characters.
    #[must_use]
    pub fn for_stage(stage: &Stage, freight: &str, stage_prefix_max: usize) -> Self {
        let short_freight: String = freight.chars().take(SHORT_FREIGHT_LEN).collect();
        let short_stage: String = stage.name().chars().take(stage_prefix_max).collect();
        let name = format!("{short_stage}.{}.{short_freight}", Uuid::now_v7().simple())
            .to_lowercase();

        let mut metadata = ObjectMeta::new(stage.namespace(), name);
        metadata.owner_references.push(OwnerReference {
            api_version: API_VERSION.to_string(),
            kind: Stage::KIND.to_string(),
            name: stage.name().to_string(),
            uid: stage.metadata.uid.clone().unwrap_or_default(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        });

        Self {
            metadata,
            spec: PromotionSpec {
                stage: stage.name().to_string(),
                freight: freight.to_string(),
            },
            status: PromotionStatus::default(),
        }
    }
}

impl Resource for Promotion {
    const KIND: &'static str = "Promotion";
    const PLURAL: &'static str = "promotions";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl HasStatus for Promotion {
    type Status = PromotionStatus;

    fn status(&self) -> &PromotionStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut PromotionStatus {
        &mut self.status
    }
}
