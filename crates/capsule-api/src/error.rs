use std::fmt::Display;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use capsule_core::CapsuleError;

/// Handler error: a status code plus a message the client can show as-is.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::from(CapsuleError::Unauthenticated)
    }
}

/// Log a server-side failure and hide its details from the client.
pub fn internal(err: impl Display) -> ApiError {
    error!("{}", err);
    ApiError::from(CapsuleError::backend("internal error"))
}

impl From<CapsuleError> for ApiError {
    fn from(err: CapsuleError) -> Self {
        let status = match err {
            CapsuleError::Validation(_) => StatusCode::BAD_REQUEST,
            CapsuleError::Forbidden(_) => StatusCode::FORBIDDEN,
            CapsuleError::Conflict(_) => StatusCode::CONFLICT,
            CapsuleError::NotFound => StatusCode::NOT_FOUND,
            CapsuleError::Unauthenticated => StatusCode::UNAUTHORIZED,
            CapsuleError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.detail())
    }
}

/// Malformed or incomplete request bodies are validation errors, not 422s.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::from(CapsuleError::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}
