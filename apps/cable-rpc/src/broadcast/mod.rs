//! Out-of-band delivery of stream data and remote commands.
//!
//! The engine only talks to a [`Broadcaster`]; where the payload ends up is
//! decided by the adapter chosen at startup.

pub mod embedded;
pub mod fanout;
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use cable_protocol::{BroadcastPayload, CommandBroadcast, RemoteDisconnect, StreamBroadcast};
use serde::Serialize;

pub use embedded::{EmbeddedBroadcastAdapter, Node};
pub use fanout::{LocalPubSub, NodeEvent};
pub use http::HttpBroadcastAdapter;

/// Remote command understood by the proxy: drop a connection.
pub const DISCONNECT_COMMAND: &str = "disconnect";

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("failed to encode broadcast: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("broadcast request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("broadcast endpoint responded with status {0}")]
    Status(u16),

    #[error("unknown broadcast command {0:?}")]
    UnknownCommand(String),

    #[error("invalid broadcast payload: {0}")]
    InvalidPayload(String),
}

/// Delivers one payload. Implementations must be safe to call from many
/// in-flight RPC calls at once.
#[async_trait]
pub trait BroadcastAdapter: Send + Sync {
    async fn broadcast(&self, payload: &BroadcastPayload) -> Result<(), BroadcastError>;
}

/// Cloneable handle shared by every call.
#[derive(Clone)]
pub struct Broadcaster {
    adapter: Arc<dyn BroadcastAdapter>,
}

impl Broadcaster {
    pub fn new(adapter: impl BroadcastAdapter + 'static) -> Self {
        Self {
            adapter: Arc::new(adapter),
        }
    }

    pub fn from_arc(adapter: Arc<dyn BroadcastAdapter>) -> Self {
        Self { adapter }
    }

    /// Send `data` to every subscriber of `stream`.
    pub async fn broadcast<T: Serialize + ?Sized + Sync>(
        &self,
        stream: &str,
        data: &T,
    ) -> Result<(), BroadcastError> {
        let payload = BroadcastPayload::Stream(StreamBroadcast {
            stream: stream.to_string(),
            data: serde_json::to_string(data)?,
        });
        self.broadcast_raw(&payload).await
    }

    pub async fn broadcast_command<T: Serialize + ?Sized + Sync>(
        &self,
        command: &str,
        payload: &T,
    ) -> Result<(), BroadcastError> {
        let payload = BroadcastPayload::Command(CommandBroadcast {
            command: command.to_string(),
            payload: serde_json::to_value(payload)?,
        });
        self.broadcast_raw(&payload).await
    }

    /// Tell every proxy holding a socket for `identifiers` to close it.
    pub async fn remote_disconnect(&self, identifiers: &str) -> Result<(), BroadcastError> {
        let payload = RemoteDisconnect {
            identifier: identifiers.to_string(),
            reconnect: true,
        };
        self.broadcast_command(DISCONNECT_COMMAND, &payload).await
    }

    pub async fn broadcast_raw(&self, payload: &BroadcastPayload) -> Result<(), BroadcastError> {
        self.adapter.broadcast(payload).await
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster").finish_non_exhaustive()
    }
}
