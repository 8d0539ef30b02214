//! Watch channels delivered by a resource store.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

use crate::core::{DynamicObject, OBJECT_NAME_FIELD};

/// Kind of change carried by a watch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    /// The object was created.
    Added,
    /// The object was changed.
    Modified,
    /// The object was removed.
    Deleted,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "ADDED"),
            Self::Modified => write!(f, "MODIFIED"),
            Self::Deleted => write!(f, "DELETED"),
        }
    }
}

/// A single raw change event.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchEvent {
    /// Kind of change.
    pub event_type: EventType,
    /// The object after the change (or its last state, for deletions).
    pub object: DynamicObject,
}

impl WatchEvent {
    /// Creates a new watch event.
    #[must_use]
    pub fn new(event_type: EventType, object: DynamicObject) -> Self {
        Self { event_type, object }
    }
}

/// An exact-match field selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    field: String,
    value: String,
}

impl FieldSelector {
    /// Selects the object with the given name.
    #[must_use]
    pub fn name_equals(name: impl Into<String>) -> Self {
        Self {
            field: OBJECT_NAME_FIELD.to_string(),
            value: name.into(),
        }
    }

    /// Parses a `field=value` selector.
    ///
    /// Only `metadata.name` and `metadata.namespace` are supported.
    pub fn parse(selector: &str) -> Result<Self, String> {
        let (field, value) = selector
            .split_once('=')
            .ok_or_else(|| format!("invalid field selector {selector:?}"))?;
        let field = field.trim();
        if field != OBJECT_NAME_FIELD && field != "metadata.namespace" {
            return Err(format!("unsupported field selector key {field:?}"));
        }
        Ok(Self {
            field: field.to_string(),
            value: value.trim().to_string(),
        })
    }

    /// Returns true if the object satisfies the selector.
    #[must_use]
    pub fn matches(&self, obj: &DynamicObject) -> bool {
        match self.field.as_str() {
            OBJECT_NAME_FIELD => obj.metadata.name == self.value,
            "metadata.namespace" => obj.metadata.namespace == self.value,
            _ => false,
        }
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.field, self.value)
    }
}

/// Options narrowing a list or watch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Optional field selector.
    pub field_selector: Option<FieldSelector>,
}

impl ListOptions {
    /// Options selecting a single object by name.
    #[must_use]
    pub fn for_name(name: impl Into<String>) -> Self {
        Self {
            field_selector: Some(FieldSelector::name_equals(name)),
        }
    }

    /// Returns true if the object passes every selector.
    #[must_use]
    pub fn matches(&self, obj: &DynamicObject) -> bool {
        self.field_selector.as_ref().map_or(true, |s| s.matches(obj))
    }
}

type StopHook = Box<dyn FnOnce() + Send>;

/// The consumer end of a watch.
///
/// Events arrive in the store's emission order until the store closes the
/// channel or the watcher is stopped. Stop hooks run exactly once, either on
/// the first call to [`Watcher::stop`] or when the watcher is dropped.
pub struct Watcher {
    events: mpsc::UnboundedReceiver<WatchEvent>,
    stop_hooks: Vec<StopHook>,
    stopped: bool,
}

impl Watcher {
    /// Creates a watcher over a channel.
    #[must_use]
    pub fn new(events: mpsc::UnboundedReceiver<WatchEvent>) -> Self {
        Self {
            events,
            stop_hooks: Vec::new(),
            stopped: false,
        }
    }

    /// Creates a connected sender/watcher pair.
    #[must_use]
    pub fn channel() -> (mpsc::UnboundedSender<WatchEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    /// Registers a hook to run when the watch is stopped.
    #[must_use]
    pub fn with_stop_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.stop_hooks.push(Box::new(hook));
        self
    }

    /// Waits for the next event; `None` once the channel is closed.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }

    /// Stops the watch. Idempotent.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.events.close();
        for hook in self.stop_hooks.drain(..) {
            hook();
        }
    }

    /// Returns true once the watch has been stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("stopped", &self.stopped)
            .field("stop_hooks", &self.stop_hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ObjectMeta, API_VERSION};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn object(name: &str) -> DynamicObject {
        DynamicObject::new(API_VERSION, "Stage", ObjectMeta::new("proj", name))
    }

    #[test]
    fn test_field_selector() {
        let sel = FieldSelector::name_equals("dev");
        assert!(sel.matches(&object("dev")));
        assert!(!sel.matches(&object("prod")));
        assert_eq!(sel.to_string(), "metadata.name=dev");

        let parsed = FieldSelector::parse("metadata.name = dev").unwrap();
        assert_eq!(parsed, sel);
        assert!(FieldSelector::parse("spec.stage=dev").is_err());
        assert!(FieldSelector::parse("nonsense").is_err());
    }

    #[test]
    fn test_list_options_default_matches_everything() {
        assert!(ListOptions::default().matches(&object("anything")));
        assert!(!ListOptions::for_name("dev").matches(&object("prod")));
    }

    #[tokio::test]
    async fn test_watcher_delivers_in_order() {
        let (tx, mut watcher) = Watcher::channel();
        tx.send(WatchEvent::new(EventType::Added, object("a"))).unwrap();
        tx.send(WatchEvent::new(EventType::Modified, object("a"))).unwrap();
        drop(tx);

        assert_eq!(watcher.next().await.unwrap().event_type, EventType::Added);
        assert_eq!(watcher.next().await.unwrap().event_type, EventType::Modified);
        assert!(watcher.next().await.is_none());
    }

    #[test]
    fn test_stop_hooks_run_exactly_once() {
        let stops = Arc::new(AtomicUsize::new(0));
        let counter = stops.clone();
        let (_tx, watcher) = Watcher::channel();
        let mut watcher = watcher.with_stop_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        watcher.stop();
        watcher.stop();
        assert!(watcher.is_stopped());
        drop(watcher);

        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_stops_watch() {
        let stops = Arc::new(AtomicUsize::new(0));
        let counter = stops.clone();
        let (_tx, watcher) = Watcher::channel();
        let watcher = watcher.with_stop_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(watcher);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_type_wire_names() {
        assert_eq!(serde_json::to_value(EventType::Deleted).unwrap(), "DELETED");
        assert_eq!(EventType::Added.to_string(), "ADDED");
    }
}
