//! In-process pub/sub node for running the engine next to its consumers.
//!
//! Uses a single `tokio::sync::broadcast` channel. Every consumer subscribes
//! and filters events locally by stream.

use std::sync::Arc;

use cable_protocol::{RemoteDisconnect, StreamBroadcast};
use tokio::sync::broadcast;

use super::Node;

/// Capacity of the broadcast channel. Slow receivers that fall behind will
/// skip messages (RecvError::Lagged).
const BROADCAST_CAPACITY: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    Stream(StreamBroadcast),
    Disconnect(RemoteDisconnect),
}

/// Cloneable hub. Store a clone wherever events need to be produced or
/// consumed.
#[derive(Debug, Clone)]
pub struct LocalPubSub {
    sender: broadcast::Sender<Arc<NodeEvent>>,
}

impl Default for LocalPubSub {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalPubSub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Each consumer calls this once to get its own receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<NodeEvent>> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn dispatch(&self, event: NodeEvent) {
        // send() returns Err if there are no receivers, which is fine.
        let _ = self.sender.send(Arc::new(event));
    }
}

impl Node for LocalPubSub {
    fn broadcast(&self, message: &StreamBroadcast) {
        self.dispatch(NodeEvent::Stream(message.clone()));
    }

    fn remote_disconnect(&self, message: &RemoteDisconnect) {
        self.dispatch(NodeEvent::Disconnect(message.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{Broadcaster, EmbeddedBroadcastAdapter};

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let hub = LocalPubSub::new();
        let mut rx = hub.subscribe();
        let broadcaster = Broadcaster::new(EmbeddedBroadcastAdapter::new(hub.clone()));

        broadcaster.broadcast("chat", &1).await.unwrap();
        broadcaster.remote_disconnect("{}").await.unwrap();

        assert_eq!(
            *rx.recv().await.unwrap(),
            NodeEvent::Stream(StreamBroadcast {
                stream: "chat".to_string(),
                data: "1".to_string(),
            })
        );
        assert!(matches!(*rx.recv().await.unwrap(), NodeEvent::Disconnect(ref d) if d.identifier == "{}"));
    }

    #[test]
    fn dispatch_without_receivers_is_dropped() {
        let hub = LocalPubSub::new();
        hub.broadcast(&StreamBroadcast {
            stream: "nobody".to_string(),
            data: "null".to_string(),
        });
        assert_eq!(hub.receiver_count(), 0);
    }
}
