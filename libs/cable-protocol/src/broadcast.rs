//! Out-of-band payloads handed to a broadcast adapter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Data for every subscriber of `stream`. `data` is already JSON-encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamBroadcast {
    pub stream: String,
    pub data: String,
}

/// Instruction for the proxy itself rather than for clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandBroadcast {
    pub command: String,
    pub payload: Value,
}

/// Payload of the `disconnect` remote command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDisconnect {
    /// Identifiers token of the connection to drop.
    pub identifier: String,
    #[serde(default)]
    pub reconnect: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BroadcastPayload {
    Stream(StreamBroadcast),
    Command(CommandBroadcast),
}
