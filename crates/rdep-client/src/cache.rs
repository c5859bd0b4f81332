//! Best-effort JSON caching on top of Redis.
//!
//! The helpers in this module never fail: writes report `false` and reads
//! report `None` when anything goes wrong, whether the value could not be
//! encoded or the store could not be reached. Callers cannot tell the two
//! apart and should treat both like a cold cache.

use crate::codec;
use async_trait::async_trait;
use deadpool_redis::Pool;
use rdep_core::{RedisDepError, RedisDepResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use validator::Validate;

/// Expiry of a cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Whole seconds. Negative values are rejected.
    Seconds(i64),
    /// A duration.
    Duration(Duration),
}

impl Expiry {
    /// Expiry in whole seconds.
    #[must_use]
    pub const fn secs(seconds: i64) -> Self {
        Self::Seconds(seconds)
    }

    /// Returns true if this expiry may be sent to the store.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        match self {
            Self::Seconds(seconds) => *seconds >= 0,
            Self::Duration(_) => true,
        }
    }

    /// Rejects negative second counts.
    pub fn validate(&self) -> RedisDepResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(RedisDepError::validation(format!(
                "expiry must not be negative: {:?}",
                self
            )))
        }
    }

    /// Appends the `EX`/`PX` arguments of a `SET` command.
    pub(crate) fn apply(&self, cmd: &mut redis::Cmd) {
        match *self {
            Self::Seconds(seconds) => {
                cmd.arg("EX").arg(seconds);
            }
            Self::Duration(duration) if duration.subsec_nanos() == 0 => {
                cmd.arg("EX").arg(duration.as_secs());
            }
            Self::Duration(duration) => {
                cmd.arg("PX").arg(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX));
            }
        }
    }
}

impl From<i64> for Expiry {
    fn from(seconds: i64) -> Self {
        Self::Seconds(seconds)
    }
}

impl From<u32> for Expiry {
    fn from(seconds: u32) -> Self {
        Self::Seconds(i64::from(seconds))
    }
}

impl From<Duration> for Expiry {
    fn from(duration: Duration) -> Self {
        Self::Duration(duration)
    }
}

/// A value read back from the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue<T = Value> {
    /// Stored bytes that did not decode as JSON, or decoded to `null`.
    Raw(Vec<u8>),
    /// The decoded value, bound to `T`.
    Value(T),
}

impl<T> CachedValue<T> {
    /// Returns the decoded value, dropping raw bytes.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// Returns true if the stored bytes could not be decoded.
    pub const fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }

    /// Returns the raw bytes as text, if they are valid UTF-8.
    pub fn raw_str(&self) -> Option<&str> {
        match self {
            Self::Raw(bytes) => std::str::from_utf8(bytes).ok(),
            Self::Value(_) => None,
        }
    }
}

/// Byte-level store used by the cache helpers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads the bytes stored under `key`.
    async fn fetch(&self, key: &str) -> RedisDepResult<Option<Vec<u8>>>;

    /// Writes `value` under `key` with an optional expiry.
    async fn store(&self, key: &str, value: Vec<u8>, expire: Option<Expiry>) -> RedisDepResult<()>;
}

#[async_trait]
impl CacheStore for Pool {
    async fn fetch(&self, key: &str) -> RedisDepResult<Option<Vec<u8>>> {
        let mut conn = self.get().await?;
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut *conn).await?;
        Ok(value)
    }

    async fn store(&self, key: &str, value: Vec<u8>, expire: Option<Expiry>) -> RedisDepResult<()> {
        let mut conn = self.get().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(expire) = expire {
            expire.apply(&mut cmd);
        }
        cmd.query_async::<()>(&mut *conn).await?;
        Ok(())
    }
}

/// Encodes `value` and stores it under `key`.
///
/// Returns `false` without touching the store when `expire` is negative.
/// Returns `false` when encoding or the write fails.
pub async fn set_cache<S, T>(store: &S, key: &str, value: &T, expire: Option<Expiry>) -> bool
where
    S: CacheStore + ?Sized,
    T: Serialize + ?Sized,
{
    if let Some(expire) = expire {
        if !expire.is_valid() {
            debug!(key, ?expire, "Refusing to cache with invalid expiry");
            return false;
        }
    }

    let bytes = match codec::encode(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(key, error = %e, "Value is not cacheable");
            return false;
        }
    };

    match store.store(key, bytes, expire).await {
        Ok(()) => {
            debug!(key, ?expire, "Cached value");
            true
        }
        Err(e) => {
            warn!(key, error = %e, "Failed to write cache entry");
            false
        }
    }
}

/// Reads `key` and decodes it as generic JSON.
///
/// Returns `None` when the key is missing or the read fails. Bytes that are
/// not JSON come back as [`CachedValue::Raw`].
pub async fn get_cache<S>(store: &S, key: &str) -> Option<CachedValue>
where
    S: CacheStore + ?Sized,
{
    read_with(store, key, Ok).await
}

/// Reads `key` and binds it to the schema `T`.
///
/// Like [`get_cache`], but returns `None` when the JSON does not fit `T`.
pub async fn get_cache_as<S, T>(store: &S, key: &str) -> Option<CachedValue<T>>
where
    S: CacheStore + ?Sized,
    T: DeserializeOwned,
{
    read_with(store, key, codec::bind::<T>).await
}

/// Reads `key`, binds it to `T` and checks its validation rules.
pub async fn get_cache_validated<S, T>(store: &S, key: &str) -> Option<CachedValue<T>>
where
    S: CacheStore + ?Sized,
    T: DeserializeOwned + Validate,
{
    read_with(store, key, codec::bind_validated::<T>).await
}

async fn read_with<S, T, F>(store: &S, key: &str, bind: F) -> Option<CachedValue<T>>
where
    S: CacheStore + ?Sized,
    F: FnOnce(Value) -> RedisDepResult<T>,
{
    let bytes = match store.fetch(key).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            debug!(key, "Cache miss");
            return None;
        }
        Err(e) => {
            warn!(key, error = %e, "Failed to read cache entry");
            return None;
        }
    };

    let value = match codec::decode(&bytes) {
        Ok(Value::Null) | Err(_) => {
            debug!(key, "Cache hit with undecodable value");
            return Some(CachedValue::Raw(bytes));
        }
        Ok(value) => value,
    };

    match bind(value) {
        Ok(bound) => {
            debug!(key, "Cache hit");
            Some(CachedValue::Value(bound))
        }
        Err(e) => {
            debug!(key, error = %e, "Cached value does not fit schema");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::HashMap;

    /// In-memory store recording writes.
    #[derive(Default)]
    struct MemoryStore {
        entries: Mutex<HashMap<String, (Vec<u8>, Option<Expiry>)>>,
    }

    impl MemoryStore {
        fn insert_raw(&self, key: &str, bytes: &[u8]) {
            self.entries
                .lock()
                .insert(key.to_string(), (bytes.to_vec(), None));
        }

        fn expiry(&self, key: &str) -> Option<Expiry> {
            self.entries.lock().get(key).and_then(|(_, expire)| *expire)
        }

        fn len(&self) -> usize {
            self.entries.lock().len()
        }
    }

    #[async_trait]
    impl CacheStore for MemoryStore {
        async fn fetch(&self, key: &str) -> RedisDepResult<Option<Vec<u8>>> {
            Ok(self.entries.lock().get(key).map(|(bytes, _)| bytes.clone()))
        }

        async fn store(&self, key: &str, value: Vec<u8>, expire: Option<Expiry>) -> RedisDepResult<()> {
            self.entries.lock().insert(key.to_string(), (value, expire));
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
    struct Session {
        user_id: u64,
        #[validate(length(min = 1))]
        token: String,
    }

    fn session() -> Session {
        Session {
            user_id: 42,
            token: "abc".to_string(),
        }
    }

    #[test]
    fn test_expiry_validity() {
        assert!(Expiry::secs(0).is_valid());
        assert!(Expiry::secs(30).is_valid());
        assert!(!Expiry::secs(-1).is_valid());
        assert!(Expiry::from(Duration::from_millis(1500)).is_valid());
        assert!(Expiry::secs(-5).validate().is_err());
    }

    #[test]
    fn test_expiry_conversions() {
        assert_eq!(Expiry::from(10_i64), Expiry::Seconds(10));
        assert_eq!(Expiry::from(10_u32), Expiry::Seconds(10));
        assert_eq!(
            Expiry::from(Duration::from_secs(2)),
            Expiry::Duration(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_cached_value_accessors() {
        let raw: CachedValue = CachedValue::Raw(b"hello".to_vec());
        assert!(raw.is_raw());
        assert_eq!(raw.raw_str(), Some("hello"));
        assert_eq!(raw.into_value(), None);

        let value: CachedValue = CachedValue::Value(json!(1));
        assert!(!value.is_raw());
        assert_eq!(value.into_value(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_negative_expiry_never_writes() {
        let mut store = MockCacheStore::new();
        store.expect_store().times(0);

        assert!(!set_cache(&store, "k", &json!({"a": 1}), Some(Expiry::secs(-1))).await);
        assert!(!set_cache(&store, "k", "text", Some(Expiry::secs(i64::MIN))).await);
    }

    #[tokio::test]
    async fn test_unencodable_value_never_writes() {
        let mut store = MockCacheStore::new();
        store.expect_store().times(0);

        let mut map = HashMap::new();
        map.insert((1, 2), 3);
        assert!(!set_cache(&store, "k", &map, None).await);
    }

    #[tokio::test]
    async fn test_store_failure_reports_false() {
        let mut store = MockCacheStore::new();
        store
            .expect_store()
            .withf(|key, _, expire| key == "k" && expire.is_none())
            .times(1)
            .returning(|_, _, _| Err(RedisDepError::connection("refused")));

        assert!(!set_cache(&store, "k", &1, None).await);
    }

    #[tokio::test]
    async fn test_store_receives_encoded_bytes_and_expiry() {
        let mut store = MockCacheStore::new();
        store
            .expect_store()
            .withf(|key, value, expire| {
                key == "greeting"
                    && value == b"\"hi\""
                    && *expire == Some(Expiry::Duration(Duration::from_secs(5)))
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        assert!(set_cache(&store, "greeting", "hi", Some(Duration::from_secs(5).into())).await);
    }

    #[tokio::test]
    async fn test_read_failure_is_none() {
        let mut store = MockCacheStore::new();
        store
            .expect_fetch()
            .returning(|_| Err(RedisDepError::connection("reset")));

        assert_eq!(get_cache(&store, "k").await, None);
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let store = MemoryStore::default();
        assert_eq!(get_cache(&store, "never-set").await, None);
        assert_eq!(get_cache_as::<_, Session>(&store, "never-set").await, None);
    }

    #[tokio::test]
    async fn test_json_roundtrip() {
        let store = MemoryStore::default();
        let value = json!({"ids": [1, 2, 3], "name": "batch", "ok": true});

        assert!(set_cache(&store, "batch", &value, Some(Expiry::secs(60))).await);
        assert_eq!(store.expiry("batch"), Some(Expiry::Seconds(60)));
        assert_eq!(
            get_cache(&store, "batch").await,
            Some(CachedValue::Value(value))
        );
    }

    #[tokio::test]
    async fn test_schema_roundtrip() {
        let store = MemoryStore::default();
        assert!(set_cache(&store, "session", &session(), None).await);

        let cached = get_cache_as::<_, Session>(&store, "session").await;
        assert_eq!(cached, Some(CachedValue::Value(session())));
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_none() {
        let store = MemoryStore::default();
        assert!(set_cache(&store, "session", &json!({"user_id": "x"}), None).await);

        assert_eq!(get_cache_as::<_, Session>(&store, "session").await, None);
    }

    #[tokio::test]
    async fn test_validated_read() {
        let store = MemoryStore::default();
        let invalid = Session {
            user_id: 1,
            token: String::new(),
        };
        assert!(set_cache(&store, "bad", &invalid, None).await);
        assert!(set_cache(&store, "good", &session(), None).await);

        assert_eq!(get_cache_validated::<_, Session>(&store, "bad").await, None);
        assert_eq!(
            get_cache_validated::<_, Session>(&store, "good").await,
            Some(CachedValue::Value(session()))
        );
    }

    #[tokio::test]
    async fn test_non_json_comes_back_raw() {
        let store = MemoryStore::default();
        store.insert_raw("legacy", b"not json at all");

        let cached = get_cache(&store, "legacy").await.unwrap();
        assert_eq!(cached.raw_str(), Some("not json at all"));

        let bound = get_cache_as::<_, Session>(&store, "legacy").await;
        assert_eq!(bound, Some(CachedValue::Raw(b"not json at all".to_vec())));
    }

    #[tokio::test]
    async fn test_json_null_comes_back_raw() {
        let store = MemoryStore::default();
        assert!(set_cache(&store, "nothing", &Option::<u8>::None, None).await);

        assert_eq!(
            get_cache(&store, "nothing").await,
            Some(CachedValue::Raw(b"null".to_vec()))
        );
    }

    #[tokio::test]
    async fn test_invalid_expiry_leaves_store_untouched() {
        let store = MemoryStore::default();
        assert!(!set_cache(&store, "k", &1, Some(Expiry::secs(-10))).await);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_expiry_command_arguments() {
        let mut cmd = redis::cmd("SET");
        Expiry::Duration(Duration::from_millis(1500)).apply(&mut cmd);
        let packed = String::from_utf8_lossy(&cmd.get_packed_command()).to_string();
        assert!(packed.contains("PX"));
        assert!(packed.contains("1500"));

        let mut cmd = redis::cmd("SET");
        Expiry::Duration(Duration::from_secs(3)).apply(&mut cmd);
        let packed = String::from_utf8_lossy(&cmd.get_packed_command()).to_string();
        assert!(packed.contains("EX"));
    }
}
