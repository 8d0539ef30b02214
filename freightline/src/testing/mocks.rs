//! Fault-injecting and recording collaborators for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::auth::Authorizer;
use crate::core::{DynamicObject, GroupVersionResource, ObjectKey};
use crate::errors::{FreightlineError, Result, StoreError};
use crate::store::{ListOptions, ResourceStore, Watcher};

#[derive(Debug, Default)]
struct Counters {
    gets: AtomicUsize,
    writes: AtomicUsize,
    watches_opened: AtomicUsize,
    watches_stopped: AtomicUsize,
}

/// Wraps a store, counts calls and fails selected operations.
///
/// Creation fails for objects whose name matches one registered with
/// [`FaultyStore::fail_create_for`]. Each watch handed out carries a stop
/// hook, so [`FaultyStore::watches_stopped`] counts real teardown.
pub struct FaultyStore {
    inner: Arc<dyn ResourceStore>,
    counters: Arc<Counters>,
    failing_creates: Mutex<HashSet<String>>,
    fail_watch: Mutex<Option<StoreError>>,
}

impl FaultyStore {
    /// Wraps `inner` with no faults configured.
    #[must_use]
    pub fn new(inner: Arc<dyn ResourceStore>) -> Self {
        Self {
            inner,
            counters: Arc::new(Counters::default()),
            failing_creates: Mutex::new(HashSet::new()),
            fail_watch: Mutex::new(None),
        }
    }

    /// Makes creation of any object whose name starts with `name_prefix` fail.
    pub fn fail_create_for(&self, name_prefix: impl Into<String>) {
        self.failing_creates.lock().insert(name_prefix.into());
    }

    /// Makes every subsequent watch fail to open with `error`.
    pub fn fail_watch_with(&self, error: StoreError) {
        *self.fail_watch.lock() = Some(error);
    }

    /// Number of `get` calls.
    #[must_use]
    pub fn gets(&self) -> usize {
        self.counters.gets.load(Ordering::SeqCst)
    }

    /// Number of attempted writes (`create` and `patch_status`).
    #[must_use]
    pub fn writes(&self) -> usize {
        self.counters.writes.load(Ordering::SeqCst)
    }

    /// Number of watches opened.
    #[must_use]
    pub fn watches_opened(&self) -> usize {
        self.counters.watches_opened.load(Ordering::SeqCst)
    }

    /// Number of watches stopped.
    #[must_use]
    pub fn watches_stopped(&self) -> usize {
        self.counters.watches_stopped.load(Ordering::SeqCst)
    }

    fn should_fail_create(&self, name: &str) -> bool {
        self.failing_creates
            .lock()
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

impl std::fmt::Debug for FaultyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultyStore")
            .field("counters", &self.counters)
            .field("failing_creates", &self.failing_creates.lock().len())
            .finish()
    }
}

#[async_trait]
impl ResourceStore for FaultyStore {
    async fn get(&self, kind: &str, key: &ObjectKey) -> Result<DynamicObject, StoreError> {
        self.counters.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(kind, key).await
    }

    async fn list(&self, kind: &str, namespace: &str) -> Result<Vec<DynamicObject>, StoreError> {
        self.inner.list(kind, namespace).await
    }

    async fn watch(
        &self,
        kind: &str,
        namespace: &str,
        options: &ListOptions,
    ) -> Result<Watcher, StoreError> {
        if let Some(err) = self.fail_watch.lock().clone() {
            return Err(err);
        }
        let watcher = self.inner.watch(kind, namespace, options).await?;
        self.counters.watches_opened.fetch_add(1, Ordering::SeqCst);
        let counters = Arc::clone(&self.counters);
        Ok(watcher.with_stop_hook(move || {
            counters.watches_stopped.fetch_add(1, Ordering::SeqCst);
        }))
    }

    async fn create(&self, object: DynamicObject) -> Result<DynamicObject, StoreError> {
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        if self.should_fail_create(&object.metadata.name) {
            return Err(StoreError::Unavailable(format!(
                "injected failure creating {} {:?}",
                object.kind, object.metadata.name
            )));
        }
        self.inner.create(object).await
    }

    async fn patch_status(
        &self,
        kind: &str,
        key: &ObjectKey,
        resource_version: Option<&str>,
        status: serde_json::Value,
    ) -> Result<DynamicObject, StoreError> {
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        self.inner
            .patch_status(kind, key, resource_version, status)
            .await
    }
}

/// An authorizer that records every request and denies chosen object names.
#[derive(Debug, Default)]
pub struct RecordingAuthorizer {
    denied: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, ObjectKey)>>,
}

impl RecordingAuthorizer {
    /// Creates an authorizer that allows everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Denies any request targeting an object named `name`.
    #[must_use]
    pub fn deny(self, name: impl Into<String>) -> Self {
        self.denied.lock().insert(name.into());
        self
    }

    /// Returns `(verb, target)` for every call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, ObjectKey)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Authorizer for RecordingAuthorizer {
    async fn authorize(
        &self,
        verb: &str,
        gvr: &GroupVersionResource,
        _subresource: &str,
        key: &ObjectKey,
    ) -> Result<()> {
        self.calls.lock().push((verb.to_string(), key.clone()));
        if self.denied.lock().contains(&key.name) {
            return Err(FreightlineError::permission_denied(format!(
                "{verb} on {} {key} denied",
                gvr.resource
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stage;
    use crate::store::{create_object, InMemoryStore};

    #[tokio::test]
    async fn test_faulty_store_injects_create_failures() {
        let store = FaultyStore::new(Arc::new(InMemoryStore::new()));
        store.fail_create_for("bad");

        assert!(create_object(&store, &Stage::new("p", "good")).await.is_ok());
        assert!(create_object(&store, &Stage::new("p", "bad-one")).await.is_err());
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn test_faulty_store_counts_watch_teardown() {
        let store = FaultyStore::new(Arc::new(InMemoryStore::new()));
        let mut watcher = store
            .watch("Stage", "p", &ListOptions::default())
            .await
            .unwrap();
        assert_eq!(store.watches_opened(), 1);
        watcher.stop();
        drop(watcher);
        assert_eq!(store.watches_stopped(), 1);
    }

    #[tokio::test]
    async fn test_recording_authorizer() {
        let authz = RecordingAuthorizer::new().deny("prod");
        let gvr = GroupVersionResource::freightline("stages");
        assert!(authz
            .authorize("promote", &gvr, "", &ObjectKey::new("p", "uat"))
            .await
            .is_ok());
        assert!(authz
            .authorize("promote", &gvr, "", &ObjectKey::new("p", "prod"))
            .await
            .is_err());
        assert_eq!(authz.calls().len(), 2);
    }
}
