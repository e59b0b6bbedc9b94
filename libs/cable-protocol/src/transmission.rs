//! Messages pushed to the client through the proxy.
//!
//! Each transmission is serialized on its own and appended, in order, to the
//! response's `transmissions` list.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol-level replies, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Welcome,
    ConfirmSubscription { identifier: String },
    RejectSubscription { identifier: String },
    Disconnect { reason: String, reconnect: bool },
}

/// Channel message addressed to one subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTransmission {
    pub message: Value,
    pub identifier: String,
}
