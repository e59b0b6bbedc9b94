//! JSON-over-HTTP binding for the three RPC verbs.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use cable_protocol::{
    CommandMessage, CommandResponse, ConnectionRequest, ConnectionResponse, DisconnectRequest,
    DisconnectResponse,
};

use crate::error::ApiError;
use crate::server::CallContext;
use crate::AppState;

/// Proxy-side session id, used for log correlation only.
pub const SID_HEADER: &str = "x-anycable-sid";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rpc/connect", post(connect))
        .route("/rpc/command", post(command))
        .route("/rpc/disconnect", post(disconnect))
}

fn call_context(headers: &HeaderMap) -> CallContext {
    CallContext {
        sid: headers
            .get(SID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

#[utoipa::path(
    post,
    path = "/rpc/connect",
    tag = "RPC",
    request_body = ConnectionRequest,
    params(("x-anycable-sid" = Option<String>, Header, description = "Proxy session id")),
    responses(
        (status = 200, description = "Connection authorized or rejected", body = ConnectionResponse),
        (status = 400, description = "Malformed environment", body = crate::error::ApiErrorBody),
    )
)]
pub async fn connect(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ConnectionRequest>,
) -> Result<Json<ConnectionResponse>, ApiError> {
    let resp = state.server.connect(&call_context(&headers), req).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/rpc/command",
    tag = "RPC",
    request_body = CommandMessage,
    params(("x-anycable-sid" = Option<String>, Header, description = "Proxy session id")),
    responses(
        (status = 200, description = "Command handled or failed", body = CommandResponse),
        (status = 400, description = "Malformed environment", body = crate::error::ApiErrorBody),
    )
)]
pub async fn command(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CommandMessage>,
) -> Result<Json<CommandResponse>, ApiError> {
    let resp = state.server.command(&call_context(&headers), req).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/rpc/disconnect",
    tag = "RPC",
    request_body = DisconnectRequest,
    params(("x-anycable-sid" = Option<String>, Header, description = "Proxy session id")),
    responses(
        (status = 200, description = "Connection cleaned up", body = DisconnectResponse),
        (status = 400, description = "Malformed environment", body = crate::error::ApiErrorBody),
    )
)]
pub async fn disconnect(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DisconnectRequest>,
) -> Result<Json<DisconnectResponse>, ApiError> {
    let resp = state.server.disconnect(&call_context(&headers), req).await?;
    Ok(Json(resp))
}
