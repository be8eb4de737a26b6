use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the edge gateway. Only auth failures ever
/// reach the caller as a non-2xx status; everything else about the backend
/// is folded into a `{message:"ERROR", db_health:{...}}` envelope so the
/// gateway never 5xxs on a transient downstream hiccup.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid API Key")]
    Unauthorized,

    #[error("rate limited")]
    RateLimited,

    #[error("storage service unreachable: {0}")]
    BackendUnreachable(String),

    #[error("storage service returned an error: {0}")]
    BackendError(String),

    #[error("{0}")]
    OwnershipViolation(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "Invalid API Key" })),
            )
                .into_response(),
            GatewayError::RateLimited
            | GatewayError::BackendUnreachable(_)
            | GatewayError::BackendError(_) => {
                log::warn!("gateway degraded: {self}");
                (
                    StatusCode::OK,
                    Json(json!({
                        "message": "ERROR",
                        "db_health": { "reachable": false },
                    })),
                )
                    .into_response()
            }
            GatewayError::OwnershipViolation(msg) => (
                StatusCode::OK,
                Json(json!({ "message": "ERROR", "detail": msg })),
            )
                .into_response(),
        }
    }
}
