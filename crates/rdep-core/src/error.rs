//! Error types for the Redis dependency layer.

use thiserror::Error;

/// Result type used across the rdep crates.
pub type RedisDepResult<T> = Result<T, RedisDepError>;

/// Errors raised by the Redis dependency layer.
///
/// Startup errors (`Configuration`, `InvalidAddress`, `Connection`) abort the
/// application. Codec errors never reach callers of the cache helpers; they
/// are only visible when the codec is used directly.
#[derive(Debug, Error)]
pub enum RedisDepError {
    // ============ Startup Errors ============
    /// Settings could not be loaded or are inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The derived Redis address is empty or malformed.
    #[error("Invalid Redis address: {0}")]
    InvalidAddress(String),

    /// The store could not be reached, or did not answer the liveness probe.
    #[error("Connection error: {0}")]
    Connection(String),

    // ============ Codec Errors ============
    /// The value has no JSON representation.
    #[error("Encode error: {0}")]
    Encode(String),

    /// The stored bytes are not valid JSON.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Decoded data does not fit the requested schema.
    #[error("Validation error: {0}")]
    Validation(String),

    // ============ Command Errors ============
    /// The key does not exist.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Lock could not be acquired or released.
    #[error("Lock error: {0}")]
    Lock(String),

    /// Redis command error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Redis pool error.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Serialization error outside the cache helpers.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RedisDepError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::KeyNotFound(_) => 404,
            Self::Validation(_) | Self::Decode(_) | Self::Encode(_) => 400,
            Self::Lock(_) => 409,
            Self::Connection(_) | Self::Pool(_) => 503,
            Self::Configuration(_)
            | Self::InvalidAddress(_)
            | Self::Redis(_)
            | Self::Serialization(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::InvalidAddress(_) => "INVALID_ADDRESS",
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Encode(_) => "ENCODE_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::KeyNotFound(_) => "KEY_NOT_FOUND",
            Self::Lock(_) => "LOCK_ERROR",
            Self::Redis(_) => "REDIS_ERROR",
            Self::Pool(_) => "POOL_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection<T: Into<String>>(message: T) -> Self {
        Self::Connection(message.into())
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true if this error must abort application startup.
    #[must_use]
    pub const fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::InvalidAddress(_) | Self::Connection(_)
        )
    }
}
