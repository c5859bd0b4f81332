//! Handler-side access to the registered facade.

use crate::response::AppError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use rdep_client::RedisDep;
use rdep_core::RedisDepError;
use std::sync::Arc;

/// The registered facade, extracted from the application state.
///
/// Rejects with `503 Service Unavailable` when Redis is not registered.
///
/// ```ignore
/// async fn handler(RedisDependence(redis): RedisDependence) -> String {
///     redis.string().get("greeting").await.ok().flatten().unwrap_or_default()
/// }
/// ```
pub struct RedisDependence(pub Arc<RedisDep>);

impl std::ops::Deref for RedisDependence {
    type Target = RedisDep;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RedisDependence
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        depends_redis(&app_state)
            .map(RedisDependence)
            .ok_or_else(|| AppError(RedisDepError::connection("Redis is not registered")))
    }
}

/// The registered facade, for code outside request handlers.
#[must_use]
pub fn depends_redis(state: &AppState) -> Option<Arc<RedisDep>> {
    state.redis()
}
