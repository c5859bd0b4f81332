use deadpool_redis::Pool;
use rdep_core::RedisDepResult;
use redis::{AsyncCommands, ToRedisArgs};

/// Sorted set commands.
#[derive(Clone)]
pub struct RedisZset {
    pool: Pool,
}

impl RedisZset {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// `ZADD key score member ...`, returning how many members were new.
    pub async fn add<M>(&self, key: &str, members_with_scores: &[(M, f64)]) -> RedisDepResult<i64>
    where
        M: ToRedisArgs + Send + Sync,
    {
        let items: Vec<(f64, &M)> = members_with_scores
            .iter()
            .map(|(member, score)| (*score, member))
            .collect();

        let mut conn = self.pool.get().await?;
        Ok(conn.zadd_multiple(key, &items).await?)
    }

    pub async fn remove<M>(&self, key: &str, members: &[M]) -> RedisDepResult<i64>
    where
        M: ToRedisArgs + Send + Sync,
    {
        let mut conn = self.pool.get().await?;
        Ok(conn.zrem(key, members).await?)
    }

    pub async fn score<M>(&self, key: &str, member: M) -> RedisDepResult<Option<f64>>
    where
        M: ToRedisArgs + Send + Sync,
    {
        let mut conn = self.pool.get().await?;
        Ok(conn.zscore(key, member).await?)
    }

    /// Members ranked `start..=stop`; negative indexes count from the end.
    pub async fn get_all(&self, key: &str, start: isize, stop: isize) -> RedisDepResult<Vec<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.zrange(key, start, stop).await?)
    }

    pub async fn get_all_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> RedisDepResult<Vec<(String, f64)>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.zrange_withscores(key, start, stop).await?)
    }

    pub async fn length(&self, key: &str) -> RedisDepResult<i64> {
        let mut conn = self.pool.get().await?;
        Ok(conn.zcard(key).await?)
    }

    /// Up to `num` members scored within `min..=max`, skipping the first `start`.
    pub async fn range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
        start: isize,
        num: isize,
    ) -> RedisDepResult<Vec<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.zrangebyscore_limit(key, min, max, start, num).await?)
    }

    pub async fn range_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
        start: isize,
        num: isize,
    ) -> RedisDepResult<Vec<(String, f64)>> {
        let mut conn = self.pool.get().await?;
        Ok(conn
            .zrangebyscore_limit_withscores(key, min, max, start, num)
            .await?)
    }

    /// Zero-based rank of `member`, highest score first when `reverse`.
    pub async fn rank<M>(&self, key: &str, member: M, reverse: bool) -> RedisDepResult<Option<i64>>
    where
        M: ToRedisArgs + Send + Sync,
    {
        let mut conn = self.pool.get().await?;
        if reverse {
            Ok(conn.zrevrank(key, member).await?)
        } else {
            Ok(conn.zrank(key, member).await?)
        }
    }
}
