//! The `RedisDep` facade handed to request handlers.

use crate::cache::{self, CachedValue, Expiry};
use crate::commands::{RedisHash, RedisList, RedisSet, RedisString, RedisZset};
use crate::connection::create_pool;
use crate::lock::RedisLock;
use deadpool_redis::Pool;
use rdep_config::RedisSettings;
use rdep_core::RedisDepResult;
use redis::{FromRedisValue, Pipeline};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
use validator::Validate;

/// One connection pool plus the per-structure command wrappers.
#[derive(Clone)]
pub struct RedisDep {
    pool: Pool,
    default_ttl: Duration,
    decode_responses: bool,
    string: RedisString,
    set: RedisSet,
    zset: RedisZset,
    list: RedisList,
    hash: RedisHash,
}

impl RedisDep {
    /// Wraps an established pool.
    #[must_use]
    pub fn new(pool: Pool, settings: &RedisSettings) -> Self {
        Self {
            string: RedisString::new(pool.clone()),
            set: RedisSet::new(pool.clone()),
            zset: RedisZset::new(pool.clone()),
            list: RedisList::new(pool.clone()),
            hash: RedisHash::new(pool.clone()),
            default_ttl: settings.default_ttl(),
            decode_responses: settings.decode_responses,
            pool,
        }
    }

    /// Connects with the startup retry policy and wraps the pool.
    pub async fn connect(settings: &RedisSettings) -> RedisDepResult<Self> {
        let pool = create_pool(settings).await?;
        Ok(Self::new(pool, settings))
    }

    pub fn string(&self) -> &RedisString {
        &self.string
    }

    pub fn set(&self) -> &RedisSet {
        &self.set
    }

    pub fn zset(&self) -> &RedisZset {
        &self.zset
    }

    pub fn list(&self) -> &RedisList {
        &self.list
    }

    pub fn hash(&self) -> &RedisHash {
        &self.hash
    }

    /// The underlying pool.
    pub fn client(&self) -> &Pool {
        &self.pool
    }

    /// TTL applied by [`cache_set_default`](Self::cache_set_default).
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// The configured `decode_responses` flag.
    ///
    /// Informational only: replies are typed at each call site, so the flag
    /// does not change how anything is read.
    pub fn decode_responses(&self) -> bool {
        self.decode_responses
    }

    pub async fn cache_set<T>(&self, key: &str, value: &T, expire: Option<Expiry>) -> bool
    where
        T: Serialize + ?Sized + Sync,
    {
        cache::set_cache(&self.pool, key, value, expire).await
    }

    /// Caches `value` for the configured TTL.
    pub async fn cache_set_default<T>(&self, key: &str, value: &T) -> bool
    where
        T: Serialize + ?Sized + Sync,
    {
        self.cache_set(key, value, Some(Expiry::Duration(self.default_ttl)))
            .await
    }

    pub async fn cache_get(&self, key: &str) -> Option<CachedValue> {
        cache::get_cache(&self.pool, key).await
    }

    pub async fn cache_get_as<T: DeserializeOwned>(&self, key: &str) -> Option<CachedValue<T>> {
        cache::get_cache_as(&self.pool, key).await
    }

    pub async fn cache_get_validated<T>(&self, key: &str) -> Option<CachedValue<T>>
    where
        T: DeserializeOwned + Validate,
    {
        cache::get_cache_validated(&self.pool, key).await
    }

    /// A lock named `name` that waits up to `timeout_secs` to be acquired.
    ///
    /// Pass [`crate::DEFAULT_LOCK_TIMEOUT`] for the usual 10 seconds.
    pub fn lock(&self, name: &str, timeout_secs: u64) -> RedisLock {
        RedisLock::new(self.pool.clone(), name, Duration::from_secs(timeout_secs))
    }

    /// Runs a batch of commands queued by `build`.
    ///
    /// When `build` returns an error nothing is sent. Otherwise the batch is
    /// flushed in one round trip, wrapped in `MULTI`/`EXEC` when
    /// `transaction` is set, and the replies are returned.
    ///
    /// ```ignore
    /// let (a, b): (i64, i64) = redis
    ///     .pipe(true, |pipe| {
    ///         pipe.incr("a", 1).incr("b", 1);
    ///         Ok(())
    ///     })
    ///     .await?;
    /// ```
    pub async fn pipe<T, F>(&self, transaction: bool, build: F) -> RedisDepResult<T>
    where
        T: FromRedisValue,
        F: FnOnce(&mut Pipeline) -> RedisDepResult<()>,
    {
        let mut pipe = redis::pipe();
        if transaction {
            pipe.atomic();
        }

        if let Err(e) = build(&mut pipe) {
            debug!(error = %e, "Pipeline discarded");
            return Err(e);
        }

        let mut conn = self.pool.get().await?;
        Ok(pipe.query_async(&mut *conn).await?)
    }

    /// Sends `PING`.
    pub async fn ping(&self) -> RedisDepResult<bool> {
        let mut conn = self.pool.get().await?;
        let reply: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(reply == "PONG")
    }

    /// Closes the pool. Checked-out connections are dropped when returned.
    pub fn close(&self) {
        self.pool.close();
        info!("Redis pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

impl std::fmt::Debug for RedisDep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("RedisDep")
            .field("max_size", &status.max_size)
            .field("size", &status.size)
            .field("default_ttl", &self.default_ttl)
            .field("decode_responses", &self.decode_responses)
            .finish_non_exhaustive()
    }
}
