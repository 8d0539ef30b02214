//! Seeded stores for service tests.

use std::sync::Arc;

use crate::core::{Freight, Project, Resource, Stage};
use crate::errors::StoreError;
use crate::store::InMemoryStore;

/// Project used by [`Fixture::pipeline`].
pub const PROJECT: &str = "demo";

/// A store preloaded with a Project, a Stage graph and some Freight.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// The seeded store.
    pub store: Arc<InMemoryStore>,
}

impl Fixture {
    /// Creates an empty fixture.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
        }
    }

    /// Seeds a five-Stage pipeline in [`PROJECT`]:
    ///
    /// ```text
    /// test -> uat -> prod
    ///      -> qa
    ///      -> staging
    /// ```
    ///
    /// Freight `f-verified` (alias `mighty-mouse`) is verified in `test`;
    /// `f-approved` is only approved for `test`.
    pub fn pipeline() -> Result<Self, StoreError> {
        let fixture = Self::empty()
            .with(&Project::new(PROJECT))?
            .with(&Stage::new(PROJECT, "test").with_warehouse("images"))?
            .with(&Stage::new(PROJECT, "uat").with_upstream("test"))?
            .with(&Stage::new(PROJECT, "qa").with_upstream("test"))?
            .with(&Stage::new(PROJECT, "staging").with_upstream("test"))?
            .with(&Stage::new(PROJECT, "prod").with_upstream("uat"))?
            .with(
                &Freight::new(PROJECT, "f-verified")
                    .with_alias("mighty-mouse")
                    .with_image("ghcr.io/demo/app", "v1.2.3")
                    .verified_in("test"),
            )?
            .with(
                &Freight::new(PROJECT, "f-approved")
                    .with_image("ghcr.io/demo/app", "v1.2.4")
                    .approved_for("test"),
            )?;
        Ok(fixture)
    }

    /// Inserts one object.
    pub fn with<T: Resource>(self, obj: &T) -> Result<Self, StoreError> {
        self.store.insert(obj)?;
        Ok(self)
    }
}
