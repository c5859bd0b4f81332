//! # rdep client
//!
//! Typed access to Redis for axum services.
//!
//! - [`codec`]: JSON encoding of cached values
//! - [`cache`]: best-effort `set_cache` / `get_cache` helpers
//! - [`connection`]: connection establishment with startup retry
//! - [`RedisDep`]: the facade bundling the pool, command wrappers, pipelines and locks

pub mod cache;
pub mod client;
pub mod codec;
pub mod commands;
pub mod connection;
pub mod lock;
pub mod retry;

pub use cache::{get_cache, get_cache_as, get_cache_validated, set_cache, CacheStore, CachedValue, Expiry};
pub use client::RedisDep;
pub use commands::{Position, RedisHash, RedisList, RedisSet, RedisString, RedisZset};
pub use connection::{connection_url, create_pool, establish, Connector, PoolConnector};
pub use lock::{RedisLock, DEFAULT_LOCK_TIMEOUT};
pub use retry::RetryPolicy;

// Re-exported so callers can build pipelines without depending on these crates directly.
pub use deadpool_redis::Pool;
pub use redis;
