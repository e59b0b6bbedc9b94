//! Application hooks and the table that wires them to channels.
//!
//! Everything is registered up front: one connected/disconnected pair and,
//! per channel name, the subscribe/unsubscribe hooks plus an explicit action
//! table. Missing hooks fall back to [`Stateless`], which accepts and does
//! nothing. Missing actions are an error.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::{Map, Value};

use crate::channel::Channel;
use crate::connection::Connection;
use crate::error::CableError;

pub type HookResult = Result<(), CableError>;

/// Decoded `data` object of a `message` command.
pub type ActionData = Map<String, Value>;

/// Runs on Connect and Disconnect.
#[async_trait]
pub trait ConnectionHook: Send + Sync {
    async fn call(&self, connection: &mut Connection) -> HookResult;
}

/// Runs on subscribe and unsubscribe.
#[async_trait]
pub trait ChannelHook: Send + Sync {
    async fn call(&self, channel: &mut Channel<'_>) -> HookResult;
}

/// Runs for one `(channel, action)` pair of a `message` command.
#[async_trait]
pub trait ActionHook: Send + Sync {
    async fn call(&self, channel: &mut Channel<'_>, data: ActionData) -> HookResult;
}

#[async_trait]
impl<F> ConnectionHook for F
where
    F: for<'a> Fn(&'a mut Connection) -> BoxFuture<'a, HookResult> + Send + Sync,
{
    async fn call(&self, connection: &mut Connection) -> HookResult {
        (self)(connection).await
    }
}

#[async_trait]
impl<F> ChannelHook for F
where
    F: for<'a, 'b> Fn(&'a mut Channel<'b>) -> BoxFuture<'a, HookResult> + Send + Sync,
{
    async fn call(&self, channel: &mut Channel<'_>) -> HookResult {
        (self)(channel).await
    }
}

#[async_trait]
impl<F> ActionHook for F
where
    F: for<'a, 'b> Fn(&'a mut Channel<'b>, ActionData) -> BoxFuture<'a, HookResult> + Send + Sync,
{
    async fn call(&self, channel: &mut Channel<'_>, data: ActionData) -> HookResult {
        (self)(channel, data).await
    }
}

/// Default behaviour for every hook that was not registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stateless;

#[async_trait]
impl ConnectionHook for Stateless {
    async fn call(&self, _connection: &mut Connection) -> HookResult {
        Ok(())
    }
}

#[async_trait]
impl ChannelHook for Stateless {
    async fn call(&self, _channel: &mut Channel<'_>) -> HookResult {
        Ok(())
    }
}

/// Hooks for one channel type.
#[derive(Clone, Default)]
pub struct ChannelConfig {
    pub subscribed: Option<Arc<dyn ChannelHook>>,
    pub unsubscribed: Option<Arc<dyn ChannelHook>>,
    pub actions: HashMap<String, Arc<dyn ActionHook>>,
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_subscribed(mut self, hook: impl ChannelHook + 'static) -> Self {
        self.subscribed = Some(Arc::new(hook));
        self
    }

    pub fn on_unsubscribed(mut self, hook: impl ChannelHook + 'static) -> Self {
        self.unsubscribed = Some(Arc::new(hook));
        self
    }

    pub fn on_action(mut self, name: impl Into<String>, hook: impl ActionHook + 'static) -> Self {
        self.actions.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn subscribed_hook(&self) -> &dyn ChannelHook {
        self.subscribed.as_deref().unwrap_or(&Stateless)
    }

    pub fn unsubscribed_hook(&self) -> &dyn ChannelHook {
        self.unsubscribed.as_deref().unwrap_or(&Stateless)
    }

    pub fn action(&self, name: &str) -> Option<&dyn ActionHook> {
        self.actions.get(name).map(|hook| hook.as_ref())
    }
}

impl std::fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut actions: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        actions.sort_unstable();
        f.debug_struct("ChannelConfig")
            .field("subscribed", &self.subscribed.is_some())
            .field("unsubscribed", &self.unsubscribed.is_some())
            .field("actions", &actions)
            .finish()
    }
}

/// Everything the dispatcher needs to know about the application.
#[derive(Clone, Default)]
pub struct Application {
    pub connected: Option<Arc<dyn ConnectionHook>>,
    pub disconnected: Option<Arc<dyn ConnectionHook>>,
    pub channels: HashMap<String, ChannelConfig>,
}

impl Application {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connected(mut self, hook: impl ConnectionHook + 'static) -> Self {
        self.connected = Some(Arc::new(hook));
        self
    }

    pub fn on_disconnected(mut self, hook: impl ConnectionHook + 'static) -> Self {
        self.disconnected = Some(Arc::new(hook));
        self
    }

    pub fn with_channel(mut self, name: impl Into<String>, config: ChannelConfig) -> Self {
        self.channels.insert(name.into(), config);
        self
    }

    pub fn connected_hook(&self) -> &dyn ConnectionHook {
        self.connected.as_deref().unwrap_or(&Stateless)
    }

    pub fn disconnected_hook(&self) -> &dyn ConnectionHook {
        self.disconnected.as_deref().unwrap_or(&Stateless)
    }

    pub fn channel(&self, name: &str) -> Result<&ChannelConfig, CableError> {
        self.channels
            .get(name)
            .ok_or_else(|| CableError::UnknownChannel(name.to_string()))
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut channels: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        channels.sort_unstable();
        f.debug_struct("Application")
            .field("connected", &self.connected.is_some())
            .field("disconnected", &self.disconnected.is_some())
            .field("channels", &channels)
            .finish()
    }
}
