//! Cache and counter handlers.

use axum::{
    extract::{Path, Query},
    Json,
};
use rdep_axum::{ApiResponse, AppError, RedisDependence};
use rdep_client::CachedValue;
use rdep_core::RedisDepError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cached entry as returned to clients.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Entry {
    Json(Value),
    /// Bytes that are not JSON, shown as lossy UTF-8.
    Raw(String),
}

pub async fn get_entry(
    redis: RedisDependence,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<Entry>>, AppError> {
    let entry = match redis.cache_get(&key).await {
        Some(CachedValue::Value(value)) => Entry::Json(value),
        Some(CachedValue::Raw(bytes)) => Entry::Raw(String::from_utf8_lossy(&bytes).into_owned()),
        None => return Err(RedisDepError::KeyNotFound(key).into()),
    };

    Ok(Json(ApiResponse::success(entry)))
}

#[derive(Debug, Serialize)]
pub struct Stored {
    pub key: String,
    pub ttl_secs: u64,
}

/// Caches the JSON body under `key` with the configured TTL.
pub async fn put_entry(
    redis: RedisDependence,
    Path(key): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<Stored>>, AppError> {
    if !redis.cache_set_default(&key, &body).await {
        return Err(RedisDepError::Internal(format!("Failed to cache '{}'", key)).into());
    }

    Ok(Json(ApiResponse::success(Stored {
        key,
        ttl_secs: redis.default_ttl().as_secs(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct StepQuery {
    #[serde(default = "default_step")]
    pub step: i64,
}

const fn default_step() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct Counter {
    pub key: String,
    pub value: i64,
}

pub async fn increment(
    redis: RedisDependence,
    Path(key): Path<String>,
    Query(query): Query<StepQuery>,
) -> Result<Json<ApiResponse<Counter>>, AppError> {
    let value = redis.string().increase(&key, query.step).await?;
    Ok(Json(ApiResponse::success(Counter { key, value })))
}
