//! In-memory resource store.
//!
//! A complete [`ResourceStore`] kept in process memory. It assigns uids,
//! creation timestamps and monotonically increasing resource versions,
//! validates object names, enforces optimistic concurrency on status
//! patches and fans change events out to open watches.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::watch::{EventType, ListOptions, WatchEvent, Watcher};
use super::ResourceStore;
use crate::core::{DynamicObject, ObjectKey, Resource, MAX_OBJECT_NAME_LEN};
use crate::errors::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct StoreKey {
    kind: String,
    namespace: String,
    name: String,
}

impl StoreKey {
    fn new(kind: &str, key: &ObjectKey) -> Self {
        Self {
            kind: kind.to_string(),
            namespace: key.namespace.clone(),
            name: key.name.clone(),
        }
    }
}

struct WatchRegistration {
    kind: String,
    namespace: String,
    options: ListOptions,
    tx: mpsc::UnboundedSender<WatchEvent>,
}

impl WatchRegistration {
    fn wants(&self, obj: &DynamicObject) -> bool {
        self.kind == obj.kind
            && (self.namespace.is_empty() || self.namespace == obj.metadata.namespace)
            && self.options.matches(obj)
    }
}

fn dns_subdomain() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").ok()
    })
    .as_ref()
}

/// An in-memory [`ResourceStore`].
#[derive(Default)]
pub struct InMemoryStore {
    objects: RwLock<BTreeMap<StoreKey, DynamicObject>>,
    watchers: Arc<DashMap<u64, WatchRegistration>>,
    next_watch_id: AtomicU64,
    resource_version: AtomicU64,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a typed object, assigning store-managed metadata.
    pub fn insert<T: Resource>(&self, obj: &T) -> Result<T, StoreError> {
        let dynamic =
            DynamicObject::from_typed(obj).map_err(|e| StoreError::Invalid(e.to_string()))?;
        self.insert_dynamic(dynamic)?
            .try_parse()
            .map_err(|e| StoreError::Invalid(e.to_string()))
    }

    /// Removes an object, notifying watches with a `DELETED` event.
    pub fn delete(&self, kind: &str, key: &ObjectKey) -> Result<DynamicObject, StoreError> {
        let mut objects = self.objects.write();
        let removed = objects
            .remove(&StoreKey::new(kind, key))
            .ok_or_else(|| StoreError::NotFound {
                kind: kind.to_string(),
                key: key.clone(),
            })?;
        self.notify(EventType::Deleted, &removed);
        Ok(removed)
    }

    /// Ends every open watch from the store side, as a server timeout would.
    pub fn close_watches(&self) {
        self.watchers.clear();
    }

    /// Returns the number of open watches.
    #[must_use]
    pub fn watch_count(&self) -> usize {
        self.watchers.len()
    }

    /// Returns the number of stored objects of a kind.
    #[must_use]
    pub fn count(&self, kind: &str) -> usize {
        self.objects.read().keys().filter(|k| k.kind == kind).count()
    }

    fn next_version(&self) -> String {
        (self.resource_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn validate(obj: &DynamicObject) -> Result<(), StoreError> {
        if obj.api_version.is_empty() || obj.kind.is_empty() {
            return Err(StoreError::Invalid(
                "apiVersion and kind must be set".to_string(),
            ));
        }
        let name = &obj.metadata.name;
        if name.is_empty() {
            return Err(StoreError::Invalid(format!(
                "{}: metadata.name: Required value",
                obj.kind
            )));
        }
        let well_formed = dns_subdomain().is_some_and(|re| re.is_match(name));
        if name.len() > MAX_OBJECT_NAME_LEN || !well_formed {
            return Err(StoreError::Invalid(format!(
                "{} {name:?} is invalid: metadata.name must be a lowercase RFC 1123 subdomain",
                obj.kind
            )));
        }
        Ok(())
    }

    fn insert_dynamic(&self, mut obj: DynamicObject) -> Result<DynamicObject, StoreError> {
        Self::validate(&obj)?;
        let key = StoreKey::new(&obj.kind, &obj.key());

        let mut objects = self.objects.write();
        if objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: obj.kind.clone(),
                key: obj.key(),
            });
        }
        obj.metadata.uid = Some(Uuid::new_v4().to_string());
        obj.metadata.creation_timestamp = Some(Utc::now());
        obj.metadata.resource_version = Some(self.next_version());
        objects.insert(key, obj.clone());
        // Events go out under the write lock so watchers see versions in order.
        self.notify(EventType::Added, &obj);
        drop(objects);

        debug!(kind = %obj.kind, key = %obj.key(), "object created");
        Ok(obj)
    }

    fn notify(&self, event_type: EventType, obj: &DynamicObject) {
        let mut closed = Vec::new();
        for entry in self.watchers.iter() {
            if !entry.wants(obj) {
                continue;
            }
            if entry.tx.send(WatchEvent::new(event_type, obj.clone())).is_err() {
                closed.push(*entry.key());
            }
        }
        for id in closed {
            self.watchers.remove(&id);
        }
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("objects", &self.objects.read().len())
            .field("watches", &self.watchers.len())
            .finish()
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get(&self, kind: &str, key: &ObjectKey) -> Result<DynamicObject, StoreError> {
        self.objects
            .read()
            .get(&StoreKey::new(kind, key))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: kind.to_string(),
                key: key.clone(),
            })
    }

    async fn list(&self, kind: &str, namespace: &str) -> Result<Vec<DynamicObject>, StoreError> {
        let objects = self.objects.read();
        let mut items: Vec<DynamicObject> = objects
            .iter()
            .filter(|(k, _)| k.kind == kind && (namespace.is_empty() || k.namespace == namespace))
            .map(|(_, v)| v.clone())
            .collect();
        items.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(items)
    }

    async fn watch(
        &self,
        kind: &str,
        namespace: &str,
        options: &ListOptions,
    ) -> Result<Watcher, StoreError> {
        let id = self.next_watch_id.fetch_add(1, Ordering::SeqCst);
        let (tx, watcher) = Watcher::channel();
        self.watchers.insert(
            id,
            WatchRegistration {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                options: options.clone(),
                tx,
            },
        );
        debug!(kind, namespace, watch_id = id, "watch opened");

        let watchers = Arc::clone(&self.watchers);
        Ok(watcher.with_stop_hook(move || {
            watchers.remove(&id);
        }))
    }

    async fn create(&self, object: DynamicObject) -> Result<DynamicObject, StoreError> {
        self.insert_dynamic(object)
    }

    async fn patch_status(
        &self,
        kind: &str,
        key: &ObjectKey,
        resource_version: Option<&str>,
        status: serde_json::Value,
    ) -> Result<DynamicObject, StoreError> {
        let mut objects = self.objects.write();
        let current = objects
            .get_mut(&StoreKey::new(kind, key))
            .ok_or_else(|| StoreError::NotFound {
                kind: kind.to_string(),
                key: key.clone(),
            })?;

        let actual = current.metadata.resource_version.clone().unwrap_or_default();
        if let Some(expected) = resource_version {
            if expected != actual {
                return Err(StoreError::Conflict {
                    kind: kind.to_string(),
                    key: key.clone(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        current.data.insert("status".to_string(), status);
        current.metadata.resource_version = Some(self.next_version());
        let updated = current.clone();
        self.notify(EventType::Modified, &updated);
        Ok(updated)
    }
}
