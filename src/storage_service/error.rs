use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::registry::RegistryError;
use crate::store::error::StoreError;

/// Errors surfaced by the storage service's HTTP handlers, mapped to HTTP
/// status: invariant violations become 4xx, programming errors 5xx.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("invalid or missing API key")]
    Unauthorized,

    #[error("zone {0} is not registered")]
    InvalidZone(i64),

    #[error("no row for index {index} iter {iter:?}")]
    NotFound { index: i64, iter: Option<i64> },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RegistryError> for ServiceError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::UnknownZone(z) => ServiceError::InvalidZone(z),
            RegistryError::Store(s) => ServiceError::Store(s),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::InvalidZone(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if matches!(self, ServiceError::Store(_)) {
            log::error!("storage service error: {self}");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
