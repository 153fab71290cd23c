//! Fan-out of web-formatted output to live viewers.
//!
//! This crate ships no viewer transport. A host that has one builds the
//! logger with a [`LiveHub`], seeds each new viewer with
//! [`crate::SharedLogger::attach_viewer`] and forwards the received chunks.

use tokio::sync::broadcast;
use tracing::trace;

/// Topic under which console output is published.
pub const LIVE_CONSOLE_TOPIC: &str = "liveconsole";

/// Default number of chunks a slow viewer may lag behind before losing some.
pub const LIVE_CHANNEL_CAPACITY: usize = 1024;

/// Receives web-formatted chunks for a topic. Delivery is best-effort.
pub trait LiveSink: Send {
    /// Publish `data` under `topic`.
    fn buffer(&self, topic: &str, data: &str);
}

/// Discards everything. Used when no viewer transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoViewers;

impl LiveSink for NoViewers {
    fn buffer(&self, _topic: &str, _data: &str) {}
}

/// A chunk of output published to live viewers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveChunk {
    /// Logical topic, e.g. [`LIVE_CONSOLE_TOPIC`].
    pub topic: String,
    /// Web-formatted text.
    pub data: String,
}

/// Broadcast hub backed by [`tokio::sync::broadcast`]. Clones share the channel.
#[derive(Debug, Clone)]
pub struct LiveHub {
    tx: broadcast::Sender<LiveChunk>,
}

impl LiveHub {
    /// Create a hub retaining up to `capacity` undelivered chunks per viewer.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Start receiving chunks published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LiveChunk> {
        self.tx.subscribe()
    }

    /// Number of attached viewers.
    pub fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LiveHub {
    fn default() -> Self {
        Self::new(LIVE_CHANNEL_CAPACITY)
    }
}

impl LiveSink for LiveHub {
    fn buffer(&self, topic: &str, data: &str) {
        let chunk = LiveChunk {
            topic: topic.to_owned(),
            data: data.to_owned(),
        };
        if self.tx.send(chunk).is_err() {
            trace!(topic, "no live viewers attached");
        }
    }
}
