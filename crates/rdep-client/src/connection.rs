//! Redis connection establishment.
//!
//! Building the connection handle is retried under a [`RetryPolicy`] so a
//! service can start before Redis is reachable. The liveness probe that
//! follows is not retried: a store that accepts connections but does not
//! answer `PING` is treated as a different kind of failure.

use crate::retry::RetryPolicy;
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use rdep_config::{redact, RedisSettings};
use rdep_core::{RedisDepError, RedisDepResult};
use redis::IntoConnectionInfo;
use std::time::Duration;
use tracing::{error, info};
use url::Url;

/// Timeout for opening a single pooled connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds connection handles and probes them.
#[async_trait]
pub trait Connector: Send + Sync {
    /// The connection handle produced by this connector.
    type Handle: Send + Sync;

    /// Builds a handle for `url`. Called once per retry attempt.
    async fn connect(&self, url: &Url, settings: &RedisSettings) -> RedisDepResult<Self::Handle>;

    /// Round-trips a lightweight command. `false` means the store is not usable.
    async fn ping(&self, handle: &Self::Handle) -> RedisDepResult<bool>;
}

/// Connector producing a `deadpool_redis::Pool`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolConnector;

#[async_trait]
impl Connector for PoolConnector {
    type Handle = Pool;

    async fn connect(&self, url: &Url, settings: &RedisSettings) -> RedisDepResult<Pool> {
        let cfg = Config::from_url(url.as_str());

        let mut builder = cfg
            .builder()
            .map_err(|e| RedisDepError::InvalidAddress(format!("Invalid Redis config: {}", e)))?
            .runtime(Runtime::Tokio1)
            .create_timeout(Some(CONNECT_TIMEOUT));

        if let Some(max_size) = settings.max_connections {
            builder = builder.max_size(max_size);
        }

        let pool = builder
            .build()
            .map_err(|e| RedisDepError::configuration(format!("Failed to create pool: {}", e)))?;

        // The pool connects lazily; check one connection out so an
        // unreachable server fails this attempt.
        drop(pool.get().await?);

        Ok(pool)
    }

    async fn ping(&self, handle: &Pool) -> RedisDepResult<bool> {
        let mut conn = handle.get().await?;
        let reply: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(reply == "PONG")
    }
}

/// Builds the connection URL from the settings.
///
/// Credentials and the db index are folded into the URL when the URL does
/// not carry its own. Fails with `InvalidAddress` when the derived address
/// is empty or not a Redis URL.
pub fn connection_url(settings: &RedisSettings) -> RedisDepResult<Url> {
    let address = settings.address();
    if address.trim().is_empty() {
        return Err(RedisDepError::InvalidAddress("Redis address is empty".to_string()));
    }

    let mut url = Url::parse(address.trim())
        .map_err(|e| RedisDepError::InvalidAddress(format!("{}: {}", redact(&address), e)))?;

    if url.username().is_empty() {
        if let Some(user) = settings.user.as_deref().filter(|u| !u.is_empty()) {
            url.set_username(user).map_err(|()| {
                RedisDepError::InvalidAddress("URL cannot carry a username".to_string())
            })?;
        }
    }

    if url.password().is_none() {
        if let Some(password) = settings.password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password)).map_err(|()| {
                RedisDepError::InvalidAddress("URL cannot carry a password".to_string())
            })?;
        }
    }

    if matches!(url.path(), "" | "/") && settings.db != 0 {
        url.set_path(&format!("/{}", settings.db));
    }

    url.as_str()
        .into_connection_info()
        .map_err(|e| RedisDepError::InvalidAddress(format!("{}: {}", redact(url.as_str()), e)))?;

    Ok(url)
}

/// Connects under `policy`, then probes the handle once.
pub async fn establish<C: Connector>(
    connector: &C,
    settings: &RedisSettings,
    policy: &RetryPolicy,
) -> RedisDepResult<C::Handle> {
    let url = connection_url(settings)?;
    let address = redact(url.as_str());

    info!(
        address = %address,
        max_attempts = policy.max_attempts,
        "Connecting to Redis..."
    );

    let handle = policy
        .execute(|| connector.connect(&url, settings))
        .await
        .map_err(|(e, attempts)| {
            error!(address = %address, attempts, error = %e, "Giving up on Redis");
            RedisDepError::connection(format!(
                "Could not connect to Redis at {} after {} attempts: {}",
                address, attempts, e
            ))
        })?;

    match connector.ping(&handle).await {
        Ok(true) => {}
        Ok(false) => {
            return Err(RedisDepError::connection(format!(
                "Redis at {} did not answer PING",
                address
            )))
        }
        Err(e) => {
            return Err(RedisDepError::connection(format!(
                "PING to Redis at {} failed: {}",
                address, e
            )))
        }
    }

    info!(address = %address, "Redis connection established");
    Ok(handle)
}

/// Creates a pool, waiting for Redis under the startup retry policy.
pub async fn create_pool(settings: &RedisSettings) -> RedisDepResult<Pool> {
    establish(&PoolConnector, settings, &RetryPolicy::startup()).await
}
