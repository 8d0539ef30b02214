//! Translation of raw store watches into typed event streams.

use tracing::{debug, info_span, Instrument};

use super::validation::require;
use super::FreightService;
use crate::cancellation::CancellationToken;
use crate::core::{Freight, ObjectKey, Promotion, Resource, Stage};
use crate::errors::{FreightlineError, Result};
use crate::events::{WatchResponse, WatchSink};
use crate::store::{get_object, ListOptions, Watcher};

impl FreightService {
    /// Streams typed change events for one kind in `namespace` into `sink`.
    ///
    /// With a `name`, the object must exist before the watch is opened. The
    /// stream ends with `Ok(())` when the store closes the watch, with
    /// [`FreightlineError::Cancelled`] when `cancel` fires, and with an error
    /// when an event cannot be converted or delivered. The underlying watch
    /// is stopped on every exit path.
    pub async fn watch_resources<T: Resource>(
        &self,
        namespace: &str,
        name: Option<&str>,
        sink: &dyn WatchSink<T>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let name = name.filter(|n| !n.is_empty());
        if let Some(name) = name {
            let key = ObjectKey::new(namespace, name);
            if get_object::<T>(self.store(), &key).await?.is_none() {
                return Err(FreightlineError::not_found(format!(
                    "{} {name:?} not found in namespace {namespace:?}",
                    T::KIND
                )));
            }
        }

        let options = name.map_or_else(ListOptions::default, ListOptions::for_name);
        let mut watcher = self
            .store()
            .watch(T::KIND, namespace, &options)
            .await
            .map_err(|e| FreightlineError::store(format!("watch {}", T::PLURAL), e))?;
        debug!(kind = T::KIND, namespace, name = name.unwrap_or(""), "watch opened");

        let span = info_span!("watch", kind = T::KIND, namespace = %namespace);
        let result = pump(&mut watcher, sink, cancel).instrument(span).await;
        watcher.stop();
        result
    }

    /// Streams Stage events, optionally for one Stage.
    pub async fn watch_stages(
        &self,
        project: &str,
        name: Option<&str>,
        sink: &dyn WatchSink<Stage>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        require("project", project)?;
        self.validate_project_exists(project).await?;
        self.watch_resources(project, name, sink, cancel).await
    }

    /// Streams events for one Promotion.
    pub async fn watch_promotion(
        &self,
        project: &str,
        name: &str,
        sink: &dyn WatchSink<Promotion>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        require("project", project)?;
        require("name", name)?;
        self.validate_project_exists(project).await?;
        self.watch_resources(project, Some(name), sink, cancel).await
    }

    /// Streams Freight events, optionally for one Freight.
    pub async fn watch_freight(
        &self,
        project: &str,
        name: Option<&str>,
        sink: &dyn WatchSink<Freight>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        require("project", project)?;
        self.validate_project_exists(project).await?;
        self.watch_resources(project, name, sink, cancel).await
    }
}

/// Moves events from `watcher` to `sink` until the stream terminates.
async fn pump<T: Resource>(
    watcher: &mut Watcher,
    sink: &dyn WatchSink<T>,
    cancel: &CancellationToken,
) -> Result<()> {
    let cancelled = || FreightlineError::Cancelled(cancel.reason().unwrap_or_default());
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(cancelled()),
            event = watcher.next() => event,
        };
        let Some(event) = event else {
            debug!("watch closed by store");
            return Ok(());
        };

        let object = event.object.try_parse::<T>()?;
        let response = WatchResponse::new(event.event_type, object);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(cancelled()),
            sent = sink.send(response) => {
                sent.map_err(|source| FreightlineError::Delivery { source })?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DynamicObject;
    use crate::errors::{ErrorCode, StoreError};
    use crate::events::{ChannelSink, CollectingSink};
    use crate::service::ServicePorts;
    use crate::store::{EventType, WatchEvent};
    use crate::testing::{FaultyStore, Fixture, PROJECT};
    use std::sync::Arc;
    use std::time::Duration;

    fn faulty(fixture: &Fixture) -> (Arc<FaultyStore>, FreightService) {
        let store = Arc::new(FaultyStore::new(fixture.store.clone()));
        let svc = FreightService::new(ServicePorts::new(store.clone()));
        (store, svc)
    }

    #[tokio::test]
    async fn test_store_close_ends_stream_cleanly() {
        let fixture = Fixture::pipeline().unwrap();
        let (store, svc) = faulty(&fixture);
        let sink = Arc::new(CollectingSink::<Stage>::new());
        let cancel = CancellationToken::new();

        let task = {
            let (svc, sink, cancel) = (svc.clone(), sink.clone(), cancel.clone());
            tokio::spawn(async move {
                svc.watch_stages(PROJECT, None, sink.as_ref(), &cancel).await
            })
        };
        while fixture.store.watch_count() == 0 {
            tokio::task::yield_now().await;
        }
        fixture
            .store
            .insert(&Stage::new(PROJECT, "hotfix").with_upstream("test"))
            .unwrap();
        fixture.store.close_watches();

        task.await.unwrap().unwrap();
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Added);
        assert_eq!(events[0].object.name(), "hotfix");
        assert_eq!(store.watches_stopped(), 1);
    }

    #[tokio::test]
    async fn test_named_watch_filters_other_objects() {
        let fixture = Fixture::pipeline().unwrap();
        let svc = FreightService::new(ServicePorts::new(fixture.store.clone()));
        let (sink, mut rx) = ChannelSink::<Freight>::pair();
        let cancel = CancellationToken::new();

        let task = {
            let (svc, cancel) = (svc.clone(), cancel.clone());
            tokio::spawn(async move {
                svc.watch_freight(PROJECT, Some("f-approved"), &sink, &cancel).await
            })
        };
        while fixture.store.watch_count() == 0 {
            tokio::task::yield_now().await;
        }
        fixture.store.insert(&Freight::new(PROJECT, "f-other")).unwrap();
        fixture
            .store
            .delete(Freight::KIND, &ObjectKey::new(PROJECT, "f-approved"))
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event_type, EventType::Deleted);
        assert_eq!(event.object.name(), "f-approved");

        cancel.cancel("done");
        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Canceled);
    }

    #[tokio::test]
    async fn test_conversion_failure_is_fatal() {
        let sink = CollectingSink::<Stage>::new();
        let cancel = CancellationToken::new();

        let mut bad = DynamicObject::from_typed(&Stage::new("p", "dev")).unwrap();
        bad.data
            .insert("spec".into(), serde_json::json!({"subscriptions": "not-a-map"}));
        let (tx, mut watcher) = Watcher::channel();
        tx.send(WatchEvent::new(EventType::Modified, bad)).unwrap();

        let err = pump(&mut watcher, &sink, &cancel).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);
        assert!(matches!(err, FreightlineError::Conversion { .. }));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_stops_watch() {
        let fixture = Fixture::pipeline().unwrap();
        let (store, svc) = faulty(&fixture);
        let sink = Arc::new(CollectingSink::<Stage>::failing_after(0));
        let cancel = CancellationToken::new();

        let task = {
            let (svc, sink, cancel) = (svc.clone(), sink.clone(), cancel.clone());
            tokio::spawn(async move {
                svc.watch_stages(PROJECT, Some("uat"), sink.as_ref(), &cancel).await
            })
        };
        while fixture.store.watch_count() == 0 {
            tokio::task::yield_now().await;
        }
        let uat = svc.get_stage(PROJECT, "uat").await.unwrap();
        crate::store::patch_status(fixture.store.as_ref(), &uat, |s| {
            s.phase = Some("Steady".into());
        })
        .await
        .unwrap();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, FreightlineError::Delivery { .. }));
        assert_eq!(store.watches_opened(), 1);
        assert_eq!(store.watches_stopped(), 1);
    }

    #[tokio::test]
    async fn test_watch_open_failure_is_internal() {
        let fixture = Fixture::pipeline().unwrap();
        let (store, svc) = faulty(&fixture);
        store.fail_watch_with(StoreError::Unavailable("connection refused".into()));
        let err = svc
            .watch_stages(
                PROJECT,
                None,
                &CollectingSink::<Stage>::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);
        assert!(err.to_string().starts_with("watch stages"));
    }

    #[tokio::test]
    async fn test_watch_promotion_requires_name() {
        let fixture = Fixture::pipeline().unwrap();
        let svc = FreightService::new(ServicePorts::new(fixture.store.clone()));
        let err = svc
            .watch_promotion(
                PROJECT,
                "",
                &CollectingSink::<Promotion>::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }
}
