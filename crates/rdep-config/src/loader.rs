//! Settings loader with layered sources.

use crate::{RedisSettings, ServerSettings};
use config::{Config, ConfigError, Environment, File};
use rdep_core::{RedisDepError, RedisDepResult};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "./config/rdep.toml";

/// Environment prefix for Redis settings (`REDIS_HOST`, `REDIS_PORT`, ...).
pub const REDIS_ENV_PREFIX: &str = "REDIS";

/// Environment prefix for server settings (`SERVER_HOST`, `SERVER_PORT`).
pub const SERVER_ENV_PREFIX: &str = "SERVER";

/// Loads settings from an optional TOML file and the environment.
///
/// Sources are applied in order, later ones winning:
/// 1. Built-in defaults
/// 2. The `[redis]` / `[server]` table of the settings file, if present
/// 3. Environment variables with the section prefix
#[derive(Debug, Clone, Default)]
pub struct SettingsLoader {
    file: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl SettingsLoader {
    /// Creates a loader reading the environment only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader reading [`DEFAULT_SETTINGS_FILE`] and the environment.
    #[must_use]
    pub fn from_default_location() -> Self {
        Self::new().with_file(DEFAULT_SETTINGS_FILE)
    }

    /// Adds a settings file. A missing file is not an error.
    #[must_use]
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replaces the process environment with the given variables.
    #[must_use]
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    /// Loads and validates the Redis settings.
    pub fn redis(&self) -> RedisDepResult<RedisSettings> {
        let settings: RedisSettings = self.load_section("redis", REDIS_ENV_PREFIX)?;
        settings.validate()?;

        info!(
            address = %redact(&settings.address()),
            db = settings.db,
            max_connections = ?settings.max_connections,
            "Loaded Redis settings"
        );

        Ok(settings)
    }

    /// Loads the server settings.
    pub fn server(&self) -> RedisDepResult<ServerSettings> {
        self.load_section("server", SERVER_ENV_PREFIX)
    }

    fn load_section<T: DeserializeOwned>(&self, section: &str, prefix: &str) -> RedisDepResult<T> {
        if self.env.is_none() {
            if let Err(e) = dotenvy::dotenv() {
                debug!("No .env file found or error loading it: {}", e);
            }
        }

        let mut builder = Config::builder();

        if let Some(path) = self.file.as_deref() {
            if path.exists() {
                debug!("Loading {} settings from: {}", section, path.display());
                let file_config = Config::builder()
                    .add_source(File::from(path).required(false))
                    .build()
                    .map_err(config_error)?;

                match file_config.get_table(section) {
                    Ok(table) => {
                        for (key, value) in table {
                            builder = builder.set_default(key, value).map_err(config_error)?;
                        }
                    }
                    Err(ConfigError::NotFound(_)) => {
                        debug!("Settings file has no [{}] table", section);
                    }
                    Err(e) => return Err(config_error(e)),
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(prefix)
                .prefix_separator("_")
                .source(self.env.clone()),
        );

        builder
            .build()
            .map_err(config_error)?
            .try_deserialize()
            .map_err(config_error)
    }
}

fn config_error(err: ConfigError) -> RedisDepError {
    RedisDepError::Configuration(err.to_string())
}

/// Masks the password part of a connection URL for logging.
#[must_use]
pub fn redact(address: &str) -> String {
    let Some((scheme, rest)) = address.split_once("://") else {
        return address.to_string();
    };
    match rest.rsplit_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split_once(':').map_or(credentials, |(user, _)| user);
            format!("{}://{}:***@{}", scheme, user, host)
        }
        None => address.to_string(),
    }
}
