pub mod application;
pub mod broadcast;
pub mod channel;
pub mod chat;
pub mod config;
pub mod connection;
pub mod error;
pub mod identifier;
pub mod logging;
pub mod routes;
pub mod server;
pub mod socket;
pub mod state;

use std::sync::Arc;

use server::Server;

pub use application::{ActionData, Application, ChannelConfig, HookResult};
pub use channel::Channel;
pub use connection::Connection;
pub use error::CableError;
pub use server::CallContext;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<Server>,
}
