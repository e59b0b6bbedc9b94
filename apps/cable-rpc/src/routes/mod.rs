pub mod health;
pub mod rpc;

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(rpc::router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // RPC
        rpc::connect,
        rpc::command,
        rpc::disconnect,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            // Wire types
            cable_protocol::Env,
            cable_protocol::EnvResponse,
            cable_protocol::Status,
            cable_protocol::ConnectionRequest,
            cable_protocol::ConnectionResponse,
            cable_protocol::CommandMessage,
            cable_protocol::CommandResponse,
            cable_protocol::DisconnectRequest,
            cable_protocol::DisconnectResponse,
            health::HealthResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "RPC", description = "Connect, Command and Disconnect calls from the WebSocket proxy"),
    )
)]
pub struct ApiDoc;
