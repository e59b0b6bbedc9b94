//! Request and response messages for the three RPC verbs.
//!
//! Field names follow the AnyCable RPC messages. Every field has a default so
//! a proxy may omit whatever it has nothing to say about.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Snapshot of the client's HTTP environment and persisted state.
///
/// `cstate` and `istate` map keys to JSON-encoded values. For Disconnect,
/// `istate` maps each channel identifier to a JSON-encoded object of that
/// channel's own `key -> JSON` map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Env {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub cstate: HashMap<String, String>,
    pub istate: HashMap<String, String>,
}

/// State diffs returned to the caller, which must echo them back next time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct EnvResponse {
    pub cstate: HashMap<String, String>,
    pub istate: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    #[default]
    Failure,
}

impl Status {
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }
}

// ---------------------------------------------------------------------------
// Connect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ConnectionRequest {
    pub path: String,
    pub headers: HashMap<String, String>,
    pub env: Env,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ConnectionResponse {
    pub status: Status,
    /// Opaque identifiers token; the caller echoes it on every later call.
    pub identifiers: String,
    pub transmissions: Vec<String>,
    pub error_msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvResponse>,
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CommandMessage {
    /// `subscribe`, `unsubscribe` or `message`.
    pub command: String,
    /// JSON channel identifier, e.g. `{"channel":"ChatChannel"}`.
    pub identifier: String,
    pub connection_identifiers: String,
    /// JSON object; only meaningful for `message`.
    pub data: String,
    pub env: Env,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CommandResponse {
    pub status: Status,
    pub disconnect: bool,
    pub stop_streams: bool,
    pub streams: Vec<String>,
    pub transmissions: Vec<String>,
    pub error_msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvResponse>,
    pub stopped_streams: Vec<String>,
}

// ---------------------------------------------------------------------------
// Disconnect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct DisconnectRequest {
    pub identifiers: String,
    /// Channel identifiers the connection was subscribed to.
    pub subscriptions: Vec<String>,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub env: Env,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct DisconnectResponse {
    pub status: Status,
    pub error_msg: String,
}
