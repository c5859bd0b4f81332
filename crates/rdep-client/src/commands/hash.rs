use crate::codec;
use deadpool_redis::Pool;
use rdep_core::{RedisDepError, RedisDepResult};
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Hash commands. Field values are stored as JSON.
#[derive(Clone)]
pub struct RedisHash {
    pool: Pool,
}

impl RedisHash {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Writes every field of `data` with `HSET`, each value JSON-encoded.
    ///
    /// `data` must serialize to a JSON object; anything else fails with
    /// `Encode`.
    pub async fn set_hash<T>(&self, key: &str, data: &T) -> RedisDepResult<()>
    where
        T: Serialize + ?Sized + Sync,
    {
        let fields = encode_fields(data)?;
        if fields.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.get().await?;
        conn.hset_multiple::<_, _, _, ()>(key, &fields).await?;
        Ok(())
    }

    /// Reads every field of `key` and decodes it.
    ///
    /// Fails with `KeyNotFound` when the hash is empty or missing.
    pub async fn get_hash(&self, key: &str) -> RedisDepResult<Map<String, Value>> {
        let mut conn = self.pool.get().await?;
        let raw: HashMap<String, Vec<u8>> = conn.hgetall(key).await?;

        if raw.is_empty() {
            return Err(RedisDepError::KeyNotFound(format!("Key '{}' does not exist", key)));
        }

        raw.into_iter()
            .map(|(field, bytes)| Ok((field, codec::decode(&bytes)?)))
            .collect()
    }

    /// Like [`get_hash`](Self::get_hash), then binds the fields to `S`.
    pub async fn get_hash_as<S: DeserializeOwned>(&self, key: &str) -> RedisDepResult<S> {
        let fields = self.get_hash(key).await?;
        codec::bind(Value::Object(fields))
    }

    pub async fn delete_field(&self, key: &str, fields: &[&str]) -> RedisDepResult<i64> {
        let mut conn = self.pool.get().await?;
        Ok(conn.hdel(key, fields).await?)
    }

    pub async fn exists_field(&self, key: &str, field: &str) -> RedisDepResult<bool> {
        let mut conn = self.pool.get().await?;
        Ok(conn.hexists(key, field).await?)
    }
}

fn encode_fields<T: Serialize + ?Sized>(data: &T) -> RedisDepResult<Vec<(String, Vec<u8>)>> {
    match serde_json::to_value(data).map_err(|e| RedisDepError::Encode(e.to_string()))? {
        Value::Object(map) => map
            .into_iter()
            .map(|(field, value)| Ok((field, codec::encode(&value)?)))
            .collect(),
        other => Err(RedisDepError::Encode(format!(
            "Hash data must be an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
