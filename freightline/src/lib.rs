//! # Freightline
//!
//! The orchestration core of a progressive-delivery control plane.
//!
//! Freight (immutable artifact bundles) flows through a graph of Stages
//! (deployment environments), gated by approval and verification. This crate
//! provides:
//!
//! - **Approval**: idempotent, authorized approval of Freight for a Stage
//! - **Availability**: the approval-versus-verification gate
//! - **Promotion fan-out**: one Promotion per direct subscriber of a Stage,
//!   with all-or-nothing authorization and aggregated creation failures
//! - **Watches**: typed, cancellable event streams over a watchable store
//! - **Bulk creation**: Project-first creation of multi-document manifests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use freightline::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let service = FreightService::new(ServicePorts::new(store));
//!
//! service
//!     .approve_freight(&ApproveFreightRequest::by_name("demo", "abc123", "prod"))
//!     .await?;
//!
//! let outcome = service
//!     .promote_subscribers(&PromoteSubscribersRequest::new("demo", "test", "abc123"))
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod auth;
pub mod availability;
pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod graph;
pub mod manifest;
pub mod observability;
pub mod render;
pub mod service;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::{
        AllowAll, Authorizer, PolicyAuthorizer, PolicyRule, VERB_CREATE, VERB_PROMOTE,
    };
    pub use crate::availability::is_freight_available;
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{LogConfig, LogFormat, ServiceConfig};
    pub use crate::core::{
        DynamicObject, Freight, ObjectKey, ObjectMeta, Project, Promotion, Resource, Stage,
    };
    pub use crate::errors::{AggregateError, ErrorCode, FreightlineError, StoreError};
    pub use crate::events::{ChannelSink, CollectingSink, WatchResponse, WatchSink};
    pub use crate::graph::direct_subscribers;
    pub use crate::observability::init_tracing;
    pub use crate::render::{render_table, Renderable};
    pub use crate::service::{
        ApproveFreightRequest, CreateResourceResult, FreightRef, FreightService,
        PromoteSubscribersOutcome, PromoteSubscribersRequest, ServicePorts,
    };
    pub use crate::store::{EventType, InMemoryStore, ResourceStore};
}
