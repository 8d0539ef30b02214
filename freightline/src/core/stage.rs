//! Stage: a deployment environment node in the subscription graph.

use serde::{Deserialize, Serialize};

use super::meta::ObjectMeta;
use super::resource::{HasStatus, Resource};

/// A reference to an upstream Stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSubscription {
    /// Upstream Stage name.
    pub name: String,
}

/// Where a Stage sources its Freight from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriptions {
    /// Warehouse producing new Freight, for Stages at the head of a pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    /// Upstream Stages whose verified Freight this Stage consumes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstream_stages: Vec<StageSubscription>,
}

/// Desired state of a Stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Freight sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<Subscriptions>,
}

/// A reference to a Freight by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreightReference {
    /// Freight name.
    pub name: String,
}

/// Observed state of a Stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStatus {
    /// Freight currently deployed to the Stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_freight: Option<FreightReference>,
    /// Coarse lifecycle phase reported by the controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

/// A deployment environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Desired state.
    #[serde(default)]
    pub spec: StageSpec,
    /// Observed state.
    #[serde(default)]
    pub status: StageStatus,
}

impl Stage {
    /// Creates a Stage with no subscriptions.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            ..Default::default()
        }
    }

    /// Adds an upstream Stage subscription.
    #[must_use]
    pub fn with_upstream(mut self, upstream: impl Into<String>) -> Self {
        self.spec
            .subscriptions
            .get_or_insert_with(Subscriptions::default)
            .upstream_stages
            .push(StageSubscription {
                name: upstream.into(),
            });
        self
    }

    /// Subscribes the Stage to a warehouse.
    #[must_use]
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.spec
            .subscriptions
            .get_or_insert_with(Subscriptions::default)
            .warehouse = Some(warehouse.into());
        self
    }

    /// Returns the names of the upstream Stages.
    pub fn upstream_stages(&self) -> impl Iterator<Item = &str> {
        self.spec
            .subscriptions
            .iter()
            .flat_map(|s| s.upstream_stages.iter())
            .map(|s| s.name.as_str())
    }

    /// Returns true if this Stage consumes Freight from the named Stage.
    #[must_use]
    pub fn subscribes_to(&self, upstream: &str) -> bool {
        self.upstream_stages().any(|name| name == upstream)
    }
}

impl Resource for Stage {
    const KIND: &'static str = "Stage";
    const PLURAL: &'static str = "stages";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl HasStatus for Stage {
    type Status = StageStatus;

    fn status(&self) -> &StageStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut StageStatus {
        &mut self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribes_to() {
        let stage = Stage::new("p", "uat").with_upstream("dev").with_upstream("qa");
        assert!(stage.subscribes_to("dev"));
        assert!(stage.subscribes_to("qa"));
        assert!(!stage.subscribes_to("prod"));
        assert_eq!(stage.upstream_stages().collect::<Vec<_>>(), vec!["dev", "qa"]);
    }

    #[test]
    fn test_no_subscriptions() {
        let stage = Stage::new("p", "dev").with_warehouse("images");
        assert_eq!(stage.upstream_stages().count(), 0);
        assert!(!stage.subscribes_to("anything"));
    }
}
