//! Settings structures.

use crate::parse;
use rdep_core::{RedisDepError, RedisDepResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Redis connection settings.
///
/// Every field maps to a `REDIS_<FIELD>` environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    /// Connect over TLS (`rediss://`).
    #[serde(deserialize_with = "parse::flag")]
    pub ssl: bool,
    /// Full connection URL. Overrides host, port and db when non-empty.
    pub url: Option<String>,
    /// Server host.
    pub host: String,
    /// Server port.
    #[serde(deserialize_with = "parse::scalar")]
    pub port: u16,
    /// ACL username.
    pub user: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Database index.
    #[serde(deserialize_with = "parse::scalar")]
    pub db: i64,
    /// Upper bound on pooled connections. Pool default when unset.
    #[serde(deserialize_with = "parse::optional")]
    pub max_connections: Option<usize>,
    /// Whether responses are read back as text. Carried for compatibility;
    /// typed replies make it informational.
    #[serde(deserialize_with = "parse::flag")]
    pub decode_responses: bool,
    /// Application secret stored alongside the connection settings.
    pub secret: Option<String>,
    /// Default time-to-live in seconds offered to callers.
    #[serde(deserialize_with = "parse::scalar")]
    pub ttl: u64,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            ssl: false,
            url: None,
            host: "localhost".to_string(),
            port: 6379,
            user: None,
            password: None,
            db: 12,
            max_connections: None,
            decode_responses: true,
            secret: None,
            ttl: 3600,
        }
    }
}

impl RedisSettings {
    /// URL scheme implied by the TLS flag.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        if self.ssl {
            "rediss"
        } else {
            "redis"
        }
    }

    /// Returns the URL override if one is set and non-empty.
    #[must_use]
    pub fn url_override(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }

    /// Returns the connection address.
    ///
    /// The URL override is returned verbatim. Otherwise the address is
    /// composed from scheme, host and port, with the db index appended as a
    /// path segment unless it is zero.
    #[must_use]
    pub fn address(&self) -> String {
        if let Some(url) = self.url_override() {
            return url.to_string();
        }

        if self.db != 0 {
            format!("{}://{}:{}/{}", self.scheme(), self.host, self.port, self.db)
        } else {
            format!("{}://{}:{}", self.scheme(), self.host, self.port)
        }
    }

    /// Returns the default TTL as a Duration.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }

    /// Checks the settings for values no connection could be built from.
    pub fn validate(&self) -> RedisDepResult<()> {
        if self.max_connections == Some(0) {
            return Err(RedisDepError::configuration(
                "max_connections must be greater than zero",
            ));
        }

        if self.url_override().is_none() {
            if self.host.trim().is_empty() {
                return Err(RedisDepError::configuration(
                    "host is required when no URL is set",
                ));
            }
            if self.port == 0 {
                return Err(RedisDepError::configuration("port must not be zero"));
            }
        }

        if self.db < 0 {
            return Err(RedisDepError::configuration("db index must not be negative"));
        }

        Ok(())
    }
}

/// HTTP server settings for the demo service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind host.
    pub host: String,
    /// Bind port.
    #[serde(deserialize_with = "parse::scalar")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerSettings {
    /// Returns the bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(db: i64, ssl: bool) -> RedisSettings {
        RedisSettings {
            host: "localhost".to_string(),
            port: 6379,
            db,
            ssl,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let settings = RedisSettings::default();
        assert!(!settings.ssl);
        assert_eq!(settings.url, None);
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 6379);
        assert_eq!(settings.db, 12);
        assert_eq!(settings.max_connections, None);
        assert!(settings.decode_responses);
        assert_eq!(settings.ttl, 3600);
    }

    #[test]
    fn test_address_with_db() {
        assert_eq!(local(3, false).address(), "redis://localhost:6379/3");
    }

    #[test]
    fn test_address_with_tls() {
        assert_eq!(local(3, true).address(), "rediss://localhost:6379/3");
    }

    #[test]
    fn test_address_without_db_segment() {
        assert_eq!(local(0, false).address(), "redis://localhost:6379");
    }

    #[test]
    fn test_default_address() {
        assert_eq!(RedisSettings::default().address(), "redis://localhost:6379/12");
    }

    #[test]
    fn test_url_override_ignores_other_fields() {
        let settings = RedisSettings {
            url: Some("redis://cache.internal:6380/1".to_string()),
            host: "ignored".to_string(),
            port: 1,
            db: 9,
            ssl: true,
            ..Default::default()
        };
        assert_eq!(settings.address(), "redis://cache.internal:6380/1");
    }

    #[test]
    fn test_empty_url_is_not_an_override() {
        let settings = RedisSettings {
            url: Some(String::new()),
            ..local(0, false)
        };
        assert_eq!(settings.address(), "redis://localhost:6379");
    }

    #[test]
    fn test_default_ttl() {
        assert_eq!(RedisSettings::default().default_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_validate_defaults() {
        assert!(RedisSettings::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_pool() {
        let settings = RedisSettings {
            max_connections: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(RedisDepError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_empty_host() {
        let settings = RedisSettings {
            host: "  ".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_empty_host_with_url() {
        let settings = RedisSettings {
            host: String::new(),
            url: Some("redis://10.0.0.5:6379".to_string()),
            ..Default::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_server_bind_addr() {
        assert_eq!(ServerSettings::default().bind_addr(), "0.0.0.0:8080");
    }
}
