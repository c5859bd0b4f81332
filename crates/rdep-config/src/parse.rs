//! Field deserializers for settings that arrive as text.
//!
//! Environment values are always strings. Typed fields parse them here so
//! that string fields such as passwords reach serde untouched.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw<T> {
    Native(T),
    Text(String),
}

/// A value given natively (settings file) or as text (environment).
pub(crate) fn scalar<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Raw::<T>::deserialize(deserializer)? {
        Raw::Native(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|e| de::Error::custom(format!("invalid value '{}': {}", text, e))),
    }
}

/// Like [`scalar`], with an empty string meaning unset.
pub(crate) fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<Raw<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Native(value)) => Ok(Some(value)),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid value '{}': {}", text, e))),
    }
}

/// A boolean; text accepts `true/false`, `1/0`, `yes/no` and `on/off`.
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Raw::<bool>::deserialize(deserializer)? {
        Raw::Native(value) => Ok(value),
        Raw::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(de::Error::custom(format!("invalid boolean '{}'", text))),
        },
    }
}
