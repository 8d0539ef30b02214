//! The Freight orchestration service.
//!
//! [`FreightService`] owns no state of its own. Everything durable lives in
//! the [`ResourceStore`] passed in through [`ServicePorts`]; every
//! state-mutating effect is preceded by a call to the [`Authorizer`].

mod approve;
mod create;
mod get;
mod lookup;
mod promote;
mod validation;
mod watch;


pub use approve::ApproveFreightRequest;
pub use create::{CreateOutcome, CreateResourceResult};
pub use promote::{PromoteSubscribersOutcome, PromoteSubscribersRequest};
pub use validation::FreightRef;

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, Instrument};

use crate::auth::{AllowAll, Authorizer};
use crate::config::ServiceConfig;
use crate::errors::Result;
use crate::observability::{operation_span, OperationTimer};
use crate::store::ResourceStore;

/// Collaborators injected into the service.
#[derive(Clone)]
pub struct ServicePorts {
    /// The resource store.
    pub store: Arc<dyn ResourceStore>,
    /// The authorization collaborator.
    pub authorizer: Arc<dyn Authorizer>,
}

impl std::fmt::Debug for ServicePorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicePorts").finish_non_exhaustive()
    }
}

impl ServicePorts {
    /// Creates ports over `store` with an allow-all authorizer.
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            authorizer: Arc::new(AllowAll),
        }
    }

    /// Sets the authorizer.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }
}

/// Approval, promotion fan-out, watch and bulk-create operations.
#[derive(Debug, Clone)]
pub struct FreightService {
    ports: ServicePorts,
    config: ServiceConfig,
}

impl FreightService {
    /// Creates a service with default configuration.
    #[must_use]
    pub fn new(ports: ServicePorts) -> Self {
        Self {
            ports,
            config: ServiceConfig::default(),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn store(&self) -> &dyn ResourceStore {
        self.ports.store.as_ref()
    }

    fn authorizer(&self) -> &dyn Authorizer {
        self.ports.authorizer.as_ref()
    }
}

/// Runs one operation inside its span and logs the outcome.
async fn traced<T, F>(operation: &'static str, project: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let timer = OperationTimer::start(operation);
    let result = fut.instrument(operation_span(operation, project)).await;
    if let Err(err) = &result {
        debug!(operation, project, code = %err.code(), error = %err, "operation returned error");
    }
    timer.finish(result.is_ok());
    result
}
