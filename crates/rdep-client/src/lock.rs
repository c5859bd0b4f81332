//! Distributed lock on a single Redis key.
//!
//! The lock is held by whoever wrote the key with `SET NX PX`; the value is
//! a random token so only the holder can release it.

use deadpool_redis::Pool;
use rdep_core::{RedisDepError, RedisDepResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix of every lock key.
pub const LOCK_KEY_PREFIX: &str = "lock";

/// How long an acquired lock survives without being released.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(60);

/// Blocking timeout used by [`crate::RedisDep::lock`] callers that have no preference.
pub const DEFAULT_LOCK_TIMEOUT: u64 = 10;

/// Pause between acquisition attempts.
const RETRY_INTERVAL: Duration = Duration::from_millis(100);

const RELEASE_SCRIPT: &str = r#"
    if redis.call("get", KEYS[1]) == ARGV[1] then
        return redis.call("del", KEYS[1])
    else
        return 0
    end
"#;

/// A named lock backed by Redis.
pub struct RedisLock {
    pool: Pool,
    name: String,
    token: String,
    blocking_timeout: Duration,
    lease: Duration,
    acquired: bool,
}

impl RedisLock {
    /// Creates a lock handle. Nothing is sent to Redis until [`acquire`](Self::acquire).
    #[must_use]
    pub fn new(pool: Pool, name: impl Into<String>, blocking_timeout: Duration) -> Self {
        Self {
            pool,
            name: name.into(),
            token: Uuid::new_v4().to_string(),
            blocking_timeout,
            lease: DEFAULT_LEASE,
            acquired: false,
        }
    }

    /// Sets how long the lock is held if never released.
    #[must_use]
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Lock name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Redis key holding the lock.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", LOCK_KEY_PREFIX, self.name)
    }

    /// Token identifying this holder.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// How long [`acquire`](Self::acquire) waits before giving up.
    #[must_use]
    pub const fn blocking_timeout(&self) -> Duration {
        self.blocking_timeout
    }

    /// Lease applied on acquisition.
    #[must_use]
    pub const fn lease(&self) -> Duration {
        self.lease
    }

    /// Returns true if this handle currently believes it holds the lock.
    #[must_use]
    pub const fn is_acquired(&self) -> bool {
        self.acquired
    }

    async fn try_acquire(&self) -> RedisDepResult<bool> {
        let mut conn = self.pool.get().await?;
        let lease_ms = u64::try_from(self.lease.as_millis()).unwrap_or(u64::MAX).max(1);

        let result: Option<String> = redis::cmd("SET")
            .arg(self.key())
            .arg(&self.token)
            .arg("NX")
            .arg("PX")
            .arg(lease_ms)
            .query_async(&mut *conn)
            .await?;

        Ok(result.is_some())
    }

    /// Tries to take the lock, polling until the blocking timeout elapses.
    ///
    /// Returns `false` if another holder kept the lock for the whole timeout.
    pub async fn acquire(&mut self) -> RedisDepResult<bool> {
        let deadline = Instant::now() + self.blocking_timeout;

        loop {
            if self.try_acquire().await? {
                self.acquired = true;
                debug!(lock = %self.name, "Acquired lock");
                return Ok(true);
            }

            if Instant::now() + RETRY_INTERVAL > deadline {
                info!(lock = %self.name, timeout_secs = self.blocking_timeout.as_secs(), "Timed out waiting for lock");
                return Ok(false);
            }

            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }

    /// Releases the lock if this handle holds it.
    ///
    /// Returns `false` when the lease had already expired or the key was
    /// taken over by someone else.
    pub async fn release(&mut self) -> RedisDepResult<bool> {
        if !self.acquired {
            return Ok(false);
        }

        let mut conn = self.pool.get().await?;
        let deleted: i32 = redis::Script::new(RELEASE_SCRIPT)
            .key(self.key())
            .arg(&self.token)
            .invoke_async(&mut *conn)
            .await?;

        self.acquired = false;

        if deleted == 0 {
            warn!(lock = %self.name, "Lock expired before release");
        } else {
            debug!(lock = %self.name, "Released lock");
        }

        Ok(deleted > 0)
    }

    /// Runs `f` while holding the lock.
    ///
    /// Fails with `Lock` when the lock cannot be acquired within the blocking
    /// timeout. The lock is released whether or not `f` succeeds.
    pub async fn scope<F, Fut, T>(mut self, f: F) -> RedisDepResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RedisDepResult<T>>,
    {
        if !self.acquire().await? {
            return Err(RedisDepError::Lock(format!(
                "Could not acquire lock '{}' within {:?}",
                self.name, self.blocking_timeout
            )));
        }

        let result = f().await;
        let released = self.release().await;

        if let Err(e) = &released {
            warn!(lock = %self.name, error = %e, "Failed to release lock");
        }

        settle(result, released)
    }
}

/// Combines the scoped result with the release outcome; an error from the
/// scope wins over a release failure.
fn settle<T>(result: RedisDepResult<T>, released: RedisDepResult<bool>) -> RedisDepResult<T> {
    let value = result?;
    released?;
    Ok(value)
}

impl std::fmt::Debug for RedisLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLock")
            .field("name", &self.name)
            .field("blocking_timeout", &self.blocking_timeout)
            .field("lease", &self.lease)
            .field("acquired", &self.acquired)
            .finish_non_exhaustive()
    }
}
