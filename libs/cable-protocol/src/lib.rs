//! Wire types shared by the RPC engine and its transports.

pub mod broadcast;
pub mod rpc;
pub mod transmission;

pub use broadcast::{BroadcastPayload, CommandBroadcast, RemoteDisconnect, StreamBroadcast};
pub use rpc::{
    CommandMessage, CommandResponse, ConnectionRequest, ConnectionResponse, DisconnectRequest,
    DisconnectResponse, Env, EnvResponse, Status,
};
pub use transmission::{MessageTransmission, Reply};
