//! Watch sink trait and implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::errors::SinkError;
use crate::store::EventType;

/// A typed change event delivered to a watch consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchResponse<T> {
    /// Kind of change.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// The object after the change.
    pub object: T,
}

impl<T> WatchResponse<T> {
    /// Creates a new response.
    #[must_use]
    pub fn new(event_type: EventType, object: T) -> Self {
        Self { event_type, object }
    }
}

/// Receives typed watch events, one at a time.
///
/// A returned error means the consumer can no longer accept events and
/// terminates the stream feeding this sink.
#[async_trait]
pub trait WatchSink<T: Send + 'static>: Send + Sync {
    /// Delivers one event.
    async fn send(&self, response: WatchResponse<T>) -> Result<(), SinkError>;
}

/// Forwards events into a bounded channel, e.g. a streaming response.
#[derive(Debug)]
pub struct ChannelSink<T> {
    tx: mpsc::Sender<WatchResponse<T>>,
}

impl<T> ChannelSink<T> {
    /// Wraps an existing sender.
    #[must_use]
    pub fn new(tx: mpsc::Sender<WatchResponse<T>>) -> Self {
        Self { tx }
    }

    /// Creates a sink and its receiving end, holding at most one event in flight.
    #[must_use]
    pub fn pair() -> (Self, mpsc::Receiver<WatchResponse<T>>) {
        let (tx, rx) = mpsc::channel(1);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl<T: Send + 'static> WatchSink<T> for ChannelSink<T> {
    async fn send(&self, response: WatchResponse<T>) -> Result<(), SinkError> {
        self.tx.send(response).await.map_err(|_| SinkError::Closed)
    }
}

/// A collecting sink for testing purposes.
///
/// Optionally starts failing after a number of deliveries, which simulates a
/// consumer that disconnects mid-stream.
#[derive(Debug)]
pub struct CollectingSink<T> {
    events: RwLock<Vec<WatchResponse<T>>>,
    fail_after: Option<usize>,
}

impl<T> Default for CollectingSink<T> {
    fn default() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            fail_after: None,
        }
    }
}

impl<T: Clone> CollectingSink<T> {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that accepts `n` events and then reports the consumer gone.
    #[must_use]
    pub fn failing_after(n: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            fail_after: Some(n),
        }
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<WatchResponse<T>> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> WatchSink<T> for CollectingSink<T> {
    async fn send(&self, response: WatchResponse<T>) -> Result<(), SinkError> {
        let mut events = self.events.write();
        if self.fail_after.is_some_and(|n| events.len() >= n) {
            return Err(SinkError::Closed);
        }
        events.push(response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stage;

    #[tokio::test]
    async fn test_channel_sink_delivers_and_detects_disconnect() {
        let (sink, mut rx) = ChannelSink::pair();
        sink.send(WatchResponse::new(EventType::Added, Stage::new("p", "dev")))
            .await
            .unwrap();
        let got = rx.recv().await.unwrap();
        assert_eq!(got.object.metadata.name, "dev");

        drop(rx);
        let err = sink
            .send(WatchResponse::new(EventType::Deleted, Stage::new("p", "dev")))
            .await
            .unwrap_err();
        assert_eq!(err, SinkError::Closed);
    }

    #[tokio::test]
    async fn test_collecting_sink_failing_after() {
        let sink = CollectingSink::failing_after(1);
        sink.send(WatchResponse::new(EventType::Added, Stage::new("p", "a")))
            .await
            .unwrap();
        assert!(sink
            .send(WatchResponse::new(EventType::Added, Stage::new("p", "b")))
            .await
            .is_err());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_response_wire_format() {
        let resp = WatchResponse::new(EventType::Added, Stage::new("p", "dev"));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["type"], "ADDED");
        assert_eq!(value["object"]["metadata"]["name"], "dev");
    }
}
