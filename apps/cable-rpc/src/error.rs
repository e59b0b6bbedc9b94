use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::broadcast::BroadcastError;
use crate::state::StateError;

/// Everything that can go wrong while handling one RPC call.
///
/// Only `Environment` (and encode failures) abort the call itself; the
/// dispatcher turns every other variant into a FAILURE response.
#[derive(Debug, thiserror::Error)]
pub enum CableError {
    #[error("invalid channel identifier: {0}")]
    InvalidIdentifier(String),

    #[error("unknown channel {0:?}")]
    UnknownChannel(String),

    #[error("unsupported command {0:?}")]
    UnsupportedCommand(String),

    #[error("unknown action {action:?} for channel {channel:?}")]
    UnknownAction { channel: String, action: String },

    #[error("expecting action to be a string, got: {0}")]
    MalformedAction(Value),

    #[error("malformed command data: {0}")]
    MalformedData(String),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("{0}")]
    Application(String),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    #[error("malformed environment: {0}")]
    Environment(String),

    #[error("failed to encode transmission: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CableError {
    /// Failure raised by application code inside a hook.
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application(message.into())
    }
}

// ---------------------------------------------------------------------------
// HTTP transport errors
// ---------------------------------------------------------------------------

/// Structured error body returned by the HTTP transport.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

/// Transport-level failure: the RPC call could not be handled at all.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<CableError> for ApiError {
    fn from(err: CableError) -> Self {
        match err {
            CableError::Environment(_) => Self::bad_request(err.to_string()),
            other => {
                tracing::error!(error = %other, "rpc call aborted");
                Self::internal("An internal error occurred")
            }
        }
    }
}
