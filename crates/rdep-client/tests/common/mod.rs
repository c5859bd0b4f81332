//! Common test infrastructure for Redis integration tests.

#![allow(dead_code)]

use deadpool_redis::Pool;
use rdep_client::{establish, PoolConnector, RedisDep, RetryPolicy};
use rdep_config::RedisSettings;
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::Redis;

/// Test Redis container wrapper.
///
/// Manages a Redis testcontainer lifecycle and provides a connected pool.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    settings: RedisSettings,
    pool: Pool,
}

impl TestRedis {
    /// Starts a fresh Redis container and connects to it.
    pub async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let settings = RedisSettings {
            host: "127.0.0.1".to_string(),
            port,
            db: 0,
            ..Default::default()
        };

        let pool = establish(
            &PoolConnector,
            &settings,
            &RetryPolicy::fixed(30, Duration::from_secs(1)),
        )
        .await
        .expect("Failed to connect to Redis");

        Self {
            _container: container,
            settings,
            pool,
        }
    }

    /// Settings pointing at the container.
    pub fn settings(&self) -> &RedisSettings {
        &self.settings
    }

    /// A pool connected to the container.
    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }

    /// A facade over the container's pool.
    pub fn facade(&self) -> RedisDep {
        RedisDep::new(self.pool(), &self.settings)
    }

    /// Runs a raw command, for checks the wrappers do not expose.
    pub async fn query<T: redis::FromRedisValue>(&self, cmd: &redis::Cmd) -> T {
        let mut conn = self.pool.get().await.expect("Failed to get connection");
        cmd.query_async(&mut *conn).await.expect("Command failed")
    }
}
