//! JSON responses shared by rdep handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rdep_core::RedisDepError;
use serde::{Deserialize, Serialize};

/// Error body returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn from_error(error: &RedisDepError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ErrorResponse) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Handler error mapped onto [`RedisDepError::status_code`].
#[derive(Debug)]
pub struct AppError(pub RedisDepError);

impl From<RedisDepError> for AppError {
    fn from(err: RedisDepError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = Json(ApiResponse::<()>::error(ErrorResponse::from_error(&self.0)));

        (status, body).into_response()
    }
}
