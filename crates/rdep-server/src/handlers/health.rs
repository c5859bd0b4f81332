//! Health check handlers.

use axum::{http::StatusCode, response::IntoResponse, Json};
use rdep_axum::{AppError, RedisDependence};
use rdep_core::RedisDepError;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Ready once Redis is registered and answers `PING`.
pub async fn readiness_check(redis: RedisDependence) -> Result<StatusCode, AppError> {
    if redis.ping().await? {
        Ok(StatusCode::OK)
    } else {
        Err(RedisDepError::connection("Redis did not answer PING").into())
    }
}
