//! Host configuration: module connection strings and server settings.
//!
//! Sources, later ones overriding earlier ones:
//! 1. a TOML file (`$VERTOBANK_CONFIG`, or `vertobank.toml` when it exists)
//! 2. environment variables `ConnectionStrings__<Key>` and `VERTOBANK_BIND_ADDR`
//!
//! ```toml
//! bind_addr = "127.0.0.1:8080"
//!
//! [connection_strings]
//! ItemsConnectionString = "memory://items"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "VERTOBANK_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "vertobank.toml";
pub const BIND_ADDR_VAR: &str = "VERTOBANK_BIND_ADDR";
pub const CONNECTION_STRING_ENV_PREFIX: &str = "ConnectionStrings__";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    connection_strings: BTreeMap<String, String>,

    #[serde(default)]
    bind_addr: Option<String>,
}

impl AppConfig {
    /// Load from the config file (if any) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH)?,
            Err(_) => Self::default(),
        };

        Ok(config.with_env_vars(std::env::vars()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay environment variables onto this config.
    pub fn with_env_vars<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            if let Some(key) = name.strip_prefix(CONNECTION_STRING_ENV_PREFIX) {
                if !key.is_empty() {
                    self.connection_strings.insert(key.to_string(), value);
                }
            } else if name == BIND_ADDR_VAR {
                self.bind_addr = Some(value);
            }
        }
        self
    }

    pub fn with_connection_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.connection_strings.insert(key.into(), value.into());
        self
    }

    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = Some(addr.into());
        self
    }

    /// The connection string stored under `key`; blank values count as missing.
    pub fn connection_string(&self, key: &str) -> Option<&str> {
        self.connection_strings
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }
}
