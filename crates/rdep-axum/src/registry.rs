//! Startup registration and shutdown of the Redis facade.

use crate::state::AppState;
use deadpool_redis::Pool;
use rdep_client::{establish, Connector, PoolConnector, RedisDep, RetryPolicy};
use rdep_config::{RedisSettings, SettingsLoader};
use rdep_core::RedisDepResult;
use std::sync::Arc;
use tracing::{info, warn};

/// Registers and terminates the Redis facade on an [`AppState`].
pub struct RedisRegistry;

impl RedisRegistry {
    /// Connects to Redis and publishes the facade on `state`.
    ///
    /// Without explicit settings they are read from the `REDIS_*`
    /// environment. Connecting is retried for up to five minutes. On any
    /// error the state is left untouched.
    pub async fn register(state: &AppState, settings: Option<RedisSettings>) -> RedisDepResult<()> {
        let settings = match settings {
            Some(settings) => settings,
            None => SettingsLoader::new().redis()?,
        };

        Self::register_with(state, settings, &PoolConnector, &RetryPolicy::startup()).await?;
        Ok(())
    }

    /// Like [`register`](Self::register) with a custom connector and retry policy.
    pub async fn register_with<C>(
        state: &AppState,
        settings: RedisSettings,
        connector: &C,
        policy: &RetryPolicy,
    ) -> RedisDepResult<Arc<RedisDep>>
    where
        C: Connector<Handle = Pool>,
    {
        settings.validate()?;

        let pool = establish(connector, &settings, policy).await?;
        let redis = Arc::new(RedisDep::new(pool, &settings));

        if let Some(previous) = state.publish(redis.clone()) {
            warn!("Redis was already registered; closing the previous pool");
            previous.close();
        }

        info!("Redis registered");
        Ok(redis)
    }

    /// Removes the facade from `state` and closes its pool.
    ///
    /// Does nothing when no facade is registered.
    pub fn terminate(state: &AppState) {
        match state.take() {
            Some(redis) => {
                redis.close();
                info!("Redis terminated");
            }
            None => info!("Redis was not registered; nothing to terminate"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use deadpool_redis::{Config, Runtime};
    use rdep_core::RedisDepError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use url::Url;

    /// Connector handing out a pool that never dials.
    pub(crate) struct StaticConnector {
        pub(crate) reachable: bool,
        pub(crate) attempts: AtomicU32,
    }

    impl StaticConnector {
        pub(crate) fn new(reachable: bool) -> Self {
            Self {
                reachable,
                attempts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Connector for StaticConnector {
        type Handle = Pool;

        async fn connect(&self, url: &Url, _settings: &RedisSettings) -> RedisDepResult<Pool> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if !self.reachable {
                return Err(RedisDepError::connection("connection refused"));
            }
            Config::from_url(url.as_str())
                .create_pool(Some(Runtime::Tokio1))
                .map_err(|e| RedisDepError::configuration(e.to_string()))
        }

        async fn ping(&self, _handle: &Pool) -> RedisDepResult<bool> {
            Ok(true)
        }
    }

    pub(crate) async fn registered_state() -> AppState {
        let state = AppState::new();
        RedisRegistry::register_with(
            &state,
            RedisSettings::default(),
            &StaticConnector::new(true),
            &RetryPolicy::once(),
        )
        .await
        .unwrap();
        state
    }

    #[tokio::test]
    async fn test_register_publishes_facade() {
        let state = registered_state().await;
        let redis = state.redis().unwrap();
        assert_eq!(redis.default_ttl(), Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_invalid_settings_publish_nothing() {
        let state = AppState::new();
        let connector = StaticConnector::new(true);
        let settings = RedisSettings {
            max_connections: Some(0),
            ..Default::default()
        };

        let result = RedisRegistry::register_with(&state, settings, &connector, &RetryPolicy::once()).await;

        assert!(matches!(result, Err(RedisDepError::Configuration(_))));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
        assert!(state.redis().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_store_publishes_nothing() {
        let state = AppState::new();
        let connector = StaticConnector::new(false);
        let policy = RetryPolicy::fixed(3, Duration::from_secs(1));

        let result = RedisRegistry::register_with(&state, RedisSettings::default(), &connector, &policy).await;

        assert!(matches!(result, Err(RedisDepError::Connection(_))));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
        assert!(state.redis().is_none());
    }

    #[tokio::test]
    async fn test_register_twice_closes_previous() {
        let state = registered_state().await;
        let first = state.redis().unwrap();

        RedisRegistry::register_with(
            &state,
            RedisSettings::default(),
            &StaticConnector::new(true),
            &RetryPolicy::once(),
        )
        .await
        .unwrap();

        assert!(first.is_closed());
        assert!(!state.redis().unwrap().is_closed());
    }

    #[tokio::test]
    async fn test_terminate_closes_and_clears() {
        let state = registered_state().await;
        let redis = state.redis().unwrap();

        RedisRegistry::terminate(&state);

        assert!(redis.is_closed());
        assert!(state.redis().is_none());
    }

    #[test]
    fn test_terminate_without_registration() {
        let state = AppState::new();
        RedisRegistry::terminate(&state);
        assert!(state.redis().is_none());
    }
}
