//! Application state carrying the Redis facade.

use parking_lot::RwLock;
use rdep_client::RedisDep;
use std::sync::Arc;

/// Name of the state slot holding the facade.
pub const REDIS_STATE_KEY: &str = "REDIS";

/// Shared application state.
///
/// The slot is empty until [`crate::RedisRegistry::register`] succeeds and
/// again after [`crate::RedisRegistry::terminate`].
#[derive(Clone, Default)]
pub struct AppState {
    redis: Arc<RwLock<Option<Arc<RedisDep>>>>,
}

impl AppState {
    /// Creates a state with an empty Redis slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The published facade, if any.
    #[must_use]
    pub fn redis(&self) -> Option<Arc<RedisDep>> {
        self.redis.read().clone()
    }

    pub(crate) fn publish(&self, redis: Arc<RedisDep>) -> Option<Arc<RedisDep>> {
        self.redis.write().replace(redis)
    }

    pub(crate) fn take(&self) -> Option<Arc<RedisDep>> {
        self.redis.write().take()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field(REDIS_STATE_KEY, &self.redis.read().is_some())
            .finish()
    }
}
