use async_trait::async_trait;
use cable_protocol::{BroadcastPayload, RemoteDisconnect, StreamBroadcast};

use super::{BroadcastAdapter, BroadcastError, DISCONNECT_COMMAND};

/// A pub/sub node living in the same process as the engine.
pub trait Node: Send + Sync {
    fn broadcast(&self, message: &StreamBroadcast);
    fn remote_disconnect(&self, message: &RemoteDisconnect);
}

/// Hands payloads straight to a co-located [`Node`] without touching the
/// network.
#[derive(Debug, Clone)]
pub struct EmbeddedBroadcastAdapter<N> {
    target: N,
}

impl<N: Node> EmbeddedBroadcastAdapter<N> {
    pub fn new(target: N) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &N {
        &self.target
    }
}

#[async_trait]
impl<N: Node> BroadcastAdapter for EmbeddedBroadcastAdapter<N> {
    async fn broadcast(&self, payload: &BroadcastPayload) -> Result<(), BroadcastError> {
        match payload {
            BroadcastPayload::Stream(message) => self.target.broadcast(message),
            BroadcastPayload::Command(command) if command.command == DISCONNECT_COMMAND => {
                let message: RemoteDisconnect = serde_json::from_value(command.payload.clone())
                    .map_err(|e| BroadcastError::InvalidPayload(e.to_string()))?;
                self.target.remote_disconnect(&message);
            }
            BroadcastPayload::Command(command) => {
                return Err(BroadcastError::UnknownCommand(command.command.clone()))
            }
        }
        Ok(())
    }
}
