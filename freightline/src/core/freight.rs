//! Freight: an immutable, versioned bundle of artifact references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::meta::ObjectMeta;
use super::resource::{HasStatus, Resource};

/// A specific commit in a Git repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCommit {
    /// Repository URL.
    pub repo_url: String,
    /// Commit id.
    pub id: String,
}

/// A container image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Image repository.
    pub repo_url: String,
    /// Tag.
    #[serde(default)]
    pub tag: String,
    /// Content digest.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub digest: String,
}

/// A Helm chart reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    /// Chart repository URL.
    pub repo_url: String,
    /// Chart name.
    #[serde(default)]
    pub name: String,
    /// Chart version.
    pub version: String,
}

/// Marker recording that a Freight was approved for a Stage.
///
/// Only its presence in [`FreightStatus::approved_for`] matters. Whatever
/// other writers put inside it is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedStage {
    /// Marker contents this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Marker recording that a Freight passed a Stage's verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedStage {
    /// When verification completed, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    /// Verification details this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Approval and verification state of a Freight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreightStatus {
    /// Stages this Freight has been explicitly approved for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_for: Option<BTreeMap<String, ApprovedStage>>,
    /// Stages this Freight has been verified in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_in: Option<BTreeMap<String, VerifiedStage>>,
    /// Status fields owned by other writers, carried through patches untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FreightStatus {
    /// Returns true if approved for the named Stage.
    #[must_use]
    pub fn is_approved_for(&self, stage: &str) -> bool {
        self.approved_for
            .as_ref()
            .is_some_and(|m| m.contains_key(stage))
    }

    /// Returns true if verified in the named Stage.
    #[must_use]
    pub fn is_verified_in(&self, stage: &str) -> bool {
        self.verified_in
            .as_ref()
            .is_some_and(|m| m.contains_key(stage))
    }

    /// Records an approval, initialising the map if needed.
    ///
    /// Returns false if the Stage was already present; the existing marker is left untouched.
    pub fn approve(&mut self, stage: impl Into<String>) -> bool {
        let approved = self.approved_for.get_or_insert_with(BTreeMap::new);
        let stage = stage.into();
        if approved.contains_key(&stage) {
            return false;
        }
        approved.insert(stage, ApprovedStage::default());
        true
    }
}

/// An immutable bundle of artifacts that moves through Stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Freight {
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Human-friendly, mutable alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Git commits.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commits: Vec<GitCommit>,
    /// Container images.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    /// Helm charts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub charts: Vec<Chart>,
    /// Approval and verification state.
    #[serde(default)]
    pub status: FreightStatus,
}

impl Freight {
    /// Creates an empty Freight.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            ..Default::default()
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Adds an image.
    #[must_use]
    pub fn with_image(mut self, repo_url: impl Into<String>, tag: impl Into<String>) -> Self {
        self.images.push(Image {
            repo_url: repo_url.into(),
            tag: tag.into(),
            digest: String::new(),
        });
        self
    }

    /// Adds a commit.
    #[must_use]
    pub fn with_commit(mut self, repo_url: impl Into<String>, id: impl Into<String>) -> Self {
        self.commits.push(GitCommit {
            repo_url: repo_url.into(),
            id: id.into(),
        });
        self
    }

    /// Marks the Freight approved for a Stage.
    #[must_use]
    pub fn approved_for(mut self, stage: impl Into<String>) -> Self {
        self.status.approve(stage);
        self
    }

    /// Marks the Freight verified in a Stage.
    #[must_use]
    pub fn verified_in(mut self, stage: impl Into<String>) -> Self {
        self.status
            .verified_in
            .get_or_insert_with(BTreeMap::new)
            .insert(stage.into(), VerifiedStage::default());
        self
    }

    /// Derives a content-addressed id from the artifact references.
    ///
    /// The result does not depend on the order artifacts were listed in.
    #[must_use]
    pub fn generate_id(&self) -> String {
        let mut artifacts: Vec<String> = Vec::new();
        for c in &self.commits {
            artifacts.push(format!("commit:{}#{}", c.repo_url, c.id));
        }
        for i in &self.images {
            artifacts.push(format!("image:{}:{}@{}", i.repo_url, i.tag, i.digest));
        }
        for c in &self.charts {
            artifacts.push(format!("chart:{}/{}:{}", c.repo_url, c.name, c.version));
        }
        artifacts.sort();

        let mut hasher = Sha256::new();
        hasher.update(artifacts.join("\n").as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl Resource for Freight {
    const KIND: &'static str = "Freight";
    const PLURAL: &'static str = "freights";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl HasStatus for Freight {
    type Status = FreightStatus;

    fn status(&self) -> &FreightStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut FreightStatus {
        &mut self.status
    }
}
