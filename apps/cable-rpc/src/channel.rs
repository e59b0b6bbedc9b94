use cable_protocol::{MessageTransmission, Reply};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::broadcast::BroadcastError;
use crate::connection::Connection;
use crate::error::CableError;
use crate::identifier::ChannelIdentifier;
use crate::state::FlatState;

/// One subscription, rebuilt for the duration of a single call.
///
/// Borrows its [`Connection`] so every effect lands in the same socket.
pub struct Channel<'a> {
    connection: &'a mut Connection,
    identifier: ChannelIdentifier,
    rejected: bool,
}

impl<'a> Channel<'a> {
    pub fn new(connection: &'a mut Connection, identifier: ChannelIdentifier) -> Self {
        Self {
            connection,
            identifier,
            rejected: false,
        }
    }

    pub fn stream_from(&mut self, stream: impl Into<String>) {
        self.connection.socket_mut().subscribe(stream);
    }

    pub fn stop_stream_from(&mut self, stream: impl Into<String>) {
        self.connection.socket_mut().unsubscribe(stream);
    }

    pub fn stop_all_streams(&mut self) {
        self.connection.socket_mut().unsubscribe_all();
    }

    /// Errors are handed back to the hook, which decides whether its own
    /// command fails.
    pub async fn broadcast<T: Serialize + ?Sized + Sync>(
        &self,
        stream: &str,
        data: &T,
    ) -> Result<(), BroadcastError> {
        let broadcaster = self.connection.broadcaster().clone();
        broadcaster.broadcast(stream, data).await
    }

    /// Write `reject_subscription`; a subscribe hook that rejects never gets
    /// a confirmation.
    pub fn reject(&mut self) -> Result<(), CableError> {
        self.rejected = true;
        let reply = Reply::RejectSubscription {
            identifier: self.identifier.as_json().to_string(),
        };
        self.connection.socket_mut().write(&reply)
    }

    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    pub(crate) fn confirm(&mut self) -> Result<(), CableError> {
        let reply = Reply::ConfirmSubscription {
            identifier: self.identifier.as_json().to_string(),
        };
        self.connection.socket_mut().write(&reply)
    }

    /// Send `{message, identifier}` to this subscriber only.
    pub fn transmit<T: Serialize + ?Sized>(&mut self, message: &T) -> Result<(), CableError> {
        let transmission = MessageTransmission {
            message: serde_json::to_value(message)?,
            identifier: self.identifier.as_json().to_string(),
        };
        self.connection.socket_mut().write(&transmission)
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.identifier.param(key)
    }

    pub fn params(&self) -> &Map<String, Value> {
        self.identifier.params()
    }

    pub fn name(&self) -> &str {
        self.identifier.channel()
    }

    pub fn identifier_json(&self) -> &str {
        self.identifier.as_json()
    }

    /// This subscription's istate.
    pub fn state_mut(&mut self) -> &mut FlatState {
        let scope = self.identifier.as_json();
        self.connection.socket_mut().istate_mut().scope_mut(scope)
    }

    pub fn state(&self) -> Option<&FlatState> {
        self.connection.socket().istate().scope(self.identifier.as_json())
    }

    pub fn connection(&self) -> &Connection {
        self.connection
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        self.connection
    }
}
