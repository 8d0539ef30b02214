//! Sinks consuming typed watch events.
//!
//! A watch stream pushes each translated event into a [`WatchSink`]; the
//! sink is typically the server side of a streaming response.

mod sink;

pub use sink::{ChannelSink, CollectingSink, WatchResponse, WatchSink};
