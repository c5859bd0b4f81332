use crate::cache::{self, CachedValue, Expiry};
use deadpool_redis::Pool;
use rdep_core::RedisDepResult;
use redis::{AsyncCommands, ToRedisArgs};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// String commands.
#[derive(Clone)]
pub struct RedisString {
    pool: Pool,
}

impl RedisString {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// `SET key value [EX|PX]`. A negative expiry fails with `Validation`
    /// before anything is sent.
    pub async fn set<V>(&self, key: &str, value: V, expire: Option<Expiry>) -> RedisDepResult<bool>
    where
        V: ToRedisArgs + Send + Sync,
    {
        if let Some(expire) = &expire {
            expire.validate()?;
        }

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(expire) = expire {
            expire.apply(&mut cmd);
        }

        let mut conn = self.pool.get().await?;
        let reply: Option<String> = cmd.query_async(&mut *conn).await?;
        Ok(reply.is_some())
    }

    pub async fn get(&self, key: &str) -> RedisDepResult<Option<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.get(key).await?)
    }

    /// Deletes `keys`, returning how many existed.
    pub async fn delete(&self, keys: &[&str]) -> RedisDepResult<i64> {
        let mut conn = self.pool.get().await?;
        Ok(conn.del(keys).await?)
    }

    pub async fn increase(&self, key: &str, step: i64) -> RedisDepResult<i64> {
        let mut conn = self.pool.get().await?;
        Ok(conn.incr(key, step).await?)
    }

    pub async fn decrease(&self, key: &str, step: i64) -> RedisDepResult<i64> {
        let mut conn = self.pool.get().await?;
        Ok(conn.decr(key, step).await?)
    }

    /// True when at least one of `keys` exists.
    pub async fn exists(&self, keys: &[&str]) -> RedisDepResult<bool> {
        let mut conn = self.pool.get().await?;
        let count: i64 = conn.exists(keys).await?;
        Ok(count > 0)
    }

    pub async fn append(&self, key: &str, value: &str) -> RedisDepResult<i64> {
        let mut conn = self.pool.get().await?;
        Ok(conn.append(key, value).await?)
    }

    /// `STRLEN key`.
    pub async fn lens(&self, key: &str) -> RedisDepResult<i64> {
        let mut conn = self.pool.get().await?;
        Ok(conn.strlen(key).await?)
    }

    /// Returns the stored value, or writes `default` and returns it.
    ///
    /// With no default a missing key yields `None` and nothing is written.
    pub async fn set_or_get(&self, key: &str, default: Option<&str>) -> RedisDepResult<Option<String>> {
        let mut conn = self.pool.get().await?;

        if conn.exists::<_, bool>(key).await? {
            return Ok(conn.get(key).await?);
        }

        let Some(default) = default else {
            return Ok(None);
        };

        conn.set::<_, _, ()>(key, default).await?;
        Ok(Some(default.to_string()))
    }

    pub async fn mset<V>(&self, items: &[(&str, V)]) -> RedisDepResult<bool>
    where
        V: ToRedisArgs + Send + Sync,
    {
        let mut conn = self.pool.get().await?;
        conn.mset::<_, _, ()>(items).await?;
        Ok(true)
    }

    pub async fn mget(&self, keys: &[&str]) -> RedisDepResult<Vec<Option<String>>> {
        let mut conn = self.pool.get().await?;
        Ok(redis::cmd("MGET").arg(keys).query_async(&mut *conn).await?)
    }

    /// See [`cache::set_cache`].
    pub async fn set_cache<T>(&self, key: &str, value: &T, expire: Option<Expiry>) -> bool
    where
        T: Serialize + ?Sized + Sync,
    {
        cache::set_cache(&self.pool, key, value, expire).await
    }

    /// See [`cache::get_cache`].
    pub async fn get_cache(&self, key: &str) -> Option<CachedValue> {
        cache::get_cache(&self.pool, key).await
    }

    /// See [`cache::get_cache_as`].
    pub async fn get_cache_as<T: DeserializeOwned>(&self, key: &str) -> Option<CachedValue<T>> {
        cache::get_cache_as(&self.pool, key).await
    }
}
