//! Demo chat application served by the `cable-rpc` binary.
//!
//! Connections identify themselves with `?user=<name>`. Every `ChatChannel`
//! subscriber streams from `chat`, and the `message` action relays
//! `data.text` to that stream.

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::application::{ActionData, Application, ChannelConfig, HookResult};
use crate::channel::Channel;
use crate::connection::Connection;
use crate::error::CableError;

pub const CHANNEL: &str = "ChatChannel";
pub const STREAM: &str = "chat";

pub fn application() -> Application {
    Application::new().on_connected(connected).with_channel(
        CHANNEL,
        ChannelConfig::new()
            .on_subscribed(subscribed)
            .on_action("message", message),
    )
}

fn connected(connection: &mut Connection) -> BoxFuture<'_, HookResult> {
    Box::pin(async move {
        let user = connection
            .query("user")
            .filter(|u| !u.is_empty())
            .ok_or_else(|| CableError::application("missing user"))?;
        connection.identified_by("user", user);
        Ok(())
    })
}

fn subscribed<'a>(channel: &'a mut Channel<'_>) -> BoxFuture<'a, HookResult> {
    Box::pin(async move {
        channel.stream_from(STREAM);
        Ok(())
    })
}

fn message<'a>(channel: &'a mut Channel<'_>, data: ActionData) -> BoxFuture<'a, HookResult> {
    Box::pin(async move {
        let text = data.get("text").cloned().unwrap_or(Value::Null);
        channel.broadcast(STREAM, &text).await?;
        Ok(())
    })
}
