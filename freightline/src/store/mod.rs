//! The resource store facade.
//!
//! The store is a namespaced, watchable object store with optimistic
//! concurrency on writes. Everything durable lives there; the service never
//! caches store state between calls.

mod memory;
mod typed;
mod watch;

pub use memory::InMemoryStore;
pub use typed::{create_object, get_object, list_objects, patch_status};
pub use watch::{EventType, FieldSelector, ListOptions, WatchEvent, Watcher};

use async_trait::async_trait;

use crate::core::{DynamicObject, ObjectKey};
use crate::errors::StoreError;

/// Loosely-typed access to the resource store.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetches one object.
    async fn get(&self, kind: &str, key: &ObjectKey) -> Result<DynamicObject, StoreError>;

    /// Lists every object of a kind in a namespace, ordered by name.
    ///
    /// An empty namespace lists across all namespaces.
    async fn list(&self, kind: &str, namespace: &str) -> Result<Vec<DynamicObject>, StoreError>;

    /// Opens a watch on a kind in a namespace.
    async fn watch(
        &self,
        kind: &str,
        namespace: &str,
        options: &ListOptions,
    ) -> Result<Watcher, StoreError>;

    /// Creates an object and returns its canonical stored form.
    async fn create(&self, object: DynamicObject) -> Result<DynamicObject, StoreError>;

    /// Replaces only the `status` of an object.
    ///
    /// When `resource_version` is given the write fails with
    /// [`StoreError::Conflict`] unless it matches the stored version.
    async fn patch_status(
        &self,
        kind: &str,
        key: &ObjectKey,
        resource_version: Option<&str>,
        status: serde_json::Value,
    ) -> Result<DynamicObject, StoreError>;
}
