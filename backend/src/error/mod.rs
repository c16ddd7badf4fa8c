use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    /// Expired resource (e.g. a join code past its expiry). Distinct from
    /// NotFound so callers can show "expired" rather than "invalid".
    Gone(String),
    /// Rejected state transition, e.g. completing an already-skipped assignment.
    Conflict(String),
    Unauthorized(String),
    /// SMS provider refused or failed to deliver. The triggering assignment is
    /// left untouched.
    Delivery(String),
    Validation(Vec<String>),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code, details) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND", None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST", None),
            AppError::Gone(msg) => (StatusCode::GONE, msg, "GONE", None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, "CONFLICT", None),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED", None),
            AppError::Delivery(msg) => {
                tracing::warn!("SMS delivery failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg, "DELIVERY_FAILED", None)
            }
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                "VALIDATION_ERROR",
                Some(serde_json::json!({ "errors": errors })),
            ),
            AppError::InternalServerError(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR",
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalServerError(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            _ => AppError::InternalServerError(err.into()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter()
                    .map(move |e| format!("{}: {}", field, e.code.as_ref()))
            })
            .collect();
        AppError::Validation(messages)
    }
}
