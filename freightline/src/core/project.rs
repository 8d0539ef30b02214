//! Project: the cluster-scoped resource that defines a namespace.

use serde::{Deserialize, Serialize};

use super::meta::ObjectMeta;
use super::resource::Resource;

/// Per-Stage promotion policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionPolicy {
    /// Stage the policy applies to.
    pub stage: String,
    /// Whether new Freight is promoted automatically.
    #[serde(default)]
    pub auto_promotion_enabled: bool,
}

/// Desired state of a Project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    /// Promotion policies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub promotion_policies: Vec<PromotionPolicy>,
}

/// Observed state of a Project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStatus {
    /// Lifecycle phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

/// A Project. Its name is also the namespace of everything it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Desired state.
    #[serde(default)]
    pub spec: ProjectSpec,
    /// Observed state.
    #[serde(default)]
    pub status: ProjectStatus,
}

impl Project {
    /// Creates a Project.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(String::new(), name),
            ..Default::default()
        }
    }
}

impl Resource for Project {
    const KIND: &'static str = "Project";
    const PLURAL: &'static str = "projects";
    const NAMESPACED: bool = false;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
