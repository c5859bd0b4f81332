use deadpool_redis::Pool;
use rdep_core::RedisDepResult;
use redis::{AsyncCommands, ToRedisArgs};
use std::collections::HashSet;

/// Set commands.
#[derive(Clone)]
pub struct RedisSet {
    pool: Pool,
}

impl RedisSet {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// `SADD`, returning how many members were new.
    pub async fn add<M>(&self, key: &str, members: &[M]) -> RedisDepResult<i64>
    where
        M: ToRedisArgs + Send + Sync,
    {
        let mut conn = self.pool.get().await?;
        Ok(conn.sadd(key, members).await?)
    }

    pub async fn remove<M>(&self, key: &str, members: &[M]) -> RedisDepResult<i64>
    where
        M: ToRedisArgs + Send + Sync,
    {
        let mut conn = self.pool.get().await?;
        Ok(conn.srem(key, members).await?)
    }

    pub async fn exists<M>(&self, key: &str, member: M) -> RedisDepResult<bool>
    where
        M: ToRedisArgs + Send + Sync,
    {
        let mut conn = self.pool.get().await?;
        Ok(conn.sismember(key, member).await?)
    }

    pub async fn get_all(&self, key: &str) -> RedisDepResult<HashSet<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.smembers(key).await?)
    }

    pub async fn length(&self, key: &str) -> RedisDepResult<i64> {
        let mut conn = self.pool.get().await?;
        Ok(conn.scard(key).await?)
    }

    pub async fn intersection(&self, keys: &[&str]) -> RedisDepResult<HashSet<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.sinter(keys).await?)
    }

    pub async fn union(&self, keys: &[&str]) -> RedisDepResult<HashSet<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.sunion(keys).await?)
    }

    pub async fn difference(&self, keys: &[&str]) -> RedisDepResult<HashSet<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.sdiff(keys).await?)
    }
}
