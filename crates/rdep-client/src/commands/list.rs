use deadpool_redis::Pool;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use rdep_core::RedisDepResult;
use redis::{AsyncCommands, ToRedisArgs};
use std::num::NonZeroUsize;

/// Where [`RedisList::linsert`] places the new element relative to the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Before,
    After,
}

/// List commands.
#[derive(Clone)]
pub struct RedisList {
    pool: Pool,
}

impl RedisList {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn lpush<V>(&self, key: &str, values: &[V]) -> RedisDepResult<i64>
    where
        V: ToRedisArgs + Send + Sync,
    {
        let mut conn = self.pool.get().await?;
        Ok(conn.lpush(key, values).await?)
    }

    pub async fn lindex(&self, key: &str, index: isize) -> RedisDepResult<Option<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.lindex(key, index).await?)
    }

    /// Inserts `value` next to the first occurrence of `pivot`.
    ///
    /// Returns the new length, `-1` when the pivot is missing and `0` when
    /// the list does not exist.
    pub async fn linsert<V>(&self, key: &str, position: Position, pivot: &str, value: V) -> RedisDepResult<i64>
    where
        V: ToRedisArgs + Send + Sync,
    {
        let mut conn = self.pool.get().await?;
        match position {
            Position::Before => Ok(conn.linsert_before(key, pivot, value).await?),
            Position::After => Ok(conn.linsert_after(key, pivot, value).await?),
        }
    }

    pub async fn llen(&self, key: &str) -> RedisDepResult<usize> {
        let mut conn = self.pool.get().await?;
        Ok(conn.llen(key).await?)
    }

    pub async fn lpop(&self, key: &str) -> RedisDepResult<Option<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.lpop(key, None).await?)
    }

    /// Pops up to `count` elements from the head.
    pub async fn lpop_count(&self, key: &str, count: NonZeroUsize) -> RedisDepResult<Vec<String>> {
        let mut conn = self.pool.get().await?;
        let popped: Option<Vec<String>> = conn.lpop(key, Some(count)).await?;
        Ok(popped.unwrap_or_default())
    }

    pub async fn lset<V>(&self, key: &str, index: isize, value: V) -> RedisDepResult<()>
    where
        V: ToRedisArgs + Send + Sync,
    {
        let mut conn = self.pool.get().await?;
        Ok(conn.lset(key, index, value).await?)
    }

    pub async fn rpush<V>(&self, key: &str, values: &[V]) -> RedisDepResult<i64>
    where
        V: ToRedisArgs + Send + Sync,
    {
        let mut conn = self.pool.get().await?;
        Ok(conn.rpush(key, values).await?)
    }

    pub async fn rpop(&self, key: &str) -> RedisDepResult<Option<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.rpop(key, None).await?)
    }

    pub async fn rpop_count(&self, key: &str, count: NonZeroUsize) -> RedisDepResult<Vec<String>> {
        let mut conn = self.pool.get().await?;
        let popped: Option<Vec<String>> = conn.rpop(key, Some(count)).await?;
        Ok(popped.unwrap_or_default())
    }

    pub async fn lrange(&self, key: &str, start: isize, stop: isize) -> RedisDepResult<Vec<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.lrange(key, start, stop).await?)
    }

    pub async fn ltrim(&self, key: &str, start: isize, stop: isize) -> RedisDepResult<()> {
        let mut conn = self.pool.get().await?;
        Ok(conn.ltrim(key, start, stop).await?)
    }

    /// Removes `count` occurrences of `value`; see `LREM` for the sign of `count`.
    pub async fn lrem<V>(&self, key: &str, count: isize, value: V) -> RedisDepResult<i64>
    where
        V: ToRedisArgs + Send + Sync,
    {
        let mut conn = self.pool.get().await?;
        Ok(conn.lrem(key, count, value).await?)
    }

    /// Streams the list element by element.
    ///
    /// The length is read once up front, then each index is fetched with its
    /// own `LINDEX`. Elements removed concurrently come back as `None`.
    pub fn iter<'a>(&'a self, key: &'a str) -> impl Stream<Item = RedisDepResult<Option<String>>> + 'a {
        stream::once(self.llen(key))
            .map_ok(move |len| {
                stream::iter(0..len)
                    .then(move |i| self.lindex(key, isize::try_from(i).unwrap_or(isize::MAX)))
            })
            .try_flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::lazy_pool;
    use rdep_core::RedisDepError;

    #[tokio::test]
    async fn test_iter_stops_on_length_error() {
        let list = RedisList::new(lazy_pool());
        let items: Vec<_> = list.iter("queue").collect().await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(RedisDepError::Pool(_))));
    }

    #[tokio::test]
    async fn test_pop_count_propagates_errors() {
        let list = RedisList::new(lazy_pool());
        let count = NonZeroUsize::new(2).unwrap();
        assert!(list.lpop_count("queue", count).await.is_err());
        assert!(list.rpop_count("queue", count).await.is_err());
    }
}
