//! Resource model for freightline.
//!
//! This module contains the typed resources the service reasons about:
//! - Object identity and metadata
//! - The `Resource` trait and the loosely-typed `DynamicObject`
//! - Freight, Stage, Promotion and Project

mod freight;
mod meta;
mod project;
mod promotion;
mod resource;
mod stage;

pub use freight::{ApprovedStage, Chart, Freight, FreightStatus, GitCommit, Image, VerifiedStage};
pub use meta::{
    GroupVersionResource, ObjectKey, ObjectMeta, OwnerReference, API_VERSION, GROUP,
    OBJECT_NAME_FIELD, VERSION,
};
pub use project::{Project, ProjectSpec, ProjectStatus, PromotionPolicy};
pub use promotion::{
    Promotion, PromotionPhase, PromotionSpec, PromotionStatus, DEFAULT_STAGE_PREFIX_MAX,
    MAX_OBJECT_NAME_LEN,
};
pub use resource::{DynamicObject, HasStatus, Resource};
pub use stage::{FreightReference, Stage, StageSpec, StageStatus, StageSubscription, Subscriptions};
