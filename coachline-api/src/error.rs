use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coachline_core::{CoreError, ErrorKind};
use serde_json::json;

const SUPPORT_HINT: &str = "Something went wrong on our side. Please try again or contact support.";

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    /// The requested slot is taken; clients re-query availability on this code.
    SlotTaken(String),
    InternalServerError(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::AuthenticationError(_) => "unauthenticated",
            AppError::AuthorizationError(_) => "forbidden",
            AppError::ValidationError(_) => "validation_error",
            AppError::NotFoundError(_) => "not_found",
            AppError::SlotTaken(_) => "slot_taken",
            AppError::InternalServerError(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::SlotTaken(msg) => (StatusCode::CONFLICT, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, SUPPORT_HINT.to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let msg = err.to_string();
        match err.kind() {
            ErrorKind::Validation => AppError::ValidationError(msg),
            ErrorKind::Conflict => AppError::SlotTaken(msg),
            ErrorKind::NotFound => AppError::NotFoundError(msg),
            ErrorKind::Ownership => AppError::AuthorizationError(msg),
            ErrorKind::Persistence => AppError::InternalServerError(msg),
        }
    }
}
