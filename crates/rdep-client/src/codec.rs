//! JSON codec for cached values.
//!
//! Values are stored as JSON bytes. Reading happens in two steps so the
//! cache helpers can tell "not JSON at all" (`Decode`) apart from "JSON of
//! the wrong shape" (`Validation`).

use rdep_core::{RedisDepError, RedisDepResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use validator::Validate;

/// Encodes a value as JSON bytes.
///
/// Records go through their `Serialize` impl, UUIDs become hyphenated
/// strings and `serde_json::Value`s pass through untouched. Values without a
/// JSON form, such as maps keyed by tuples, fail with `Encode`.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> RedisDepResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| RedisDepError::Encode(e.to_string()))
}

/// Parses JSON bytes into a generic value.
pub fn decode(bytes: &[u8]) -> RedisDepResult<Value> {
    serde_json::from_slice(bytes).map_err(|e| RedisDepError::Decode(e.to_string()))
}

/// Coerces a decoded value into `S`.
///
/// A JSON string holding a JSON document of `S` is unwrapped, so records
/// that were written as a text dump inside a string stay readable.
pub fn bind<S: DeserializeOwned>(value: Value) -> RedisDepResult<S> {
    let nested = match &value {
        Value::String(text) => Some(text.clone()),
        _ => None,
    };

    match serde_json::from_value(value) {
        Ok(bound) => Ok(bound),
        Err(err) => match nested {
            Some(text) => serde_json::from_str(&text)
                .map_err(|_| RedisDepError::validation(err.to_string())),
            None => Err(RedisDepError::validation(err.to_string())),
        },
    }
}

/// Coerces a decoded value into `S` and runs its validation rules.
pub fn bind_validated<S: DeserializeOwned + Validate>(value: Value) -> RedisDepResult<S> {
    let bound: S = bind(value)?;
    bound
        .validate()
        .map_err(|e| RedisDepError::validation(e.to_string()))?;
    Ok(bound)
}

/// Decodes JSON bytes straight into `S`.
pub fn decode_as<S: DeserializeOwned>(bytes: &[u8]) -> RedisDepResult<S> {
    bind(decode(bytes)?)
}
