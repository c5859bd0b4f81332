//! Thin per-structure wrappers over the pooled connection.
//!
//! Every method checks a connection out of the pool, sends one command and
//! hands back the reply. Store errors propagate unchanged.

mod hash;
mod list;
mod set;
mod string;
mod zset;

pub use hash::RedisHash;
pub use list::{Position, RedisList};
pub use set::RedisSet;
pub use string::RedisString;
pub use zset::RedisZset;

#[cfg(test)]
pub(crate) fn lazy_pool() -> deadpool_redis::Pool {
    // Nothing listens on port 1; any checkout fails fast.
    deadpool_redis::Config::from_url("redis://127.0.0.1:1")
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .unwrap()
}
