//! Process configuration from environment variables.
//!
//! A `.env` file in the working directory is loaded first, if present;
//! variables already set in the environment win over it.
//!
//! | Variable        | Default                                  |
//! |-----------------|------------------------------------------|
//! | `GMAP_API_KEY`  | required                                 |
//! | `REDIS_HOST`    | `localhost` (a full `redis://` URL also works) |
//! | `REDIS_PORT`    | `6379`                                   |
//! | `HOST`          | `0.0.0.0`                                |
//! | `PORT`          | `3000`                                   |
//! | `CACHE_BACKEND` | `redis` (`memory` keeps entries in-process) |
//! | `GMAP_BASE_URL` | the public Maps web-services URL         |

use std::env;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info};

pub const API_KEY_VAR: &str = "GMAP_API_KEY";

const DEFAULT_REDIS_HOST: &str = "localhost";
const DEFAULT_REDIS_PORT: u16 = 6379;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("You need to pass api key as `GMAP_API_KEY` env variable")]
    MissingApiKey,

    #[error("`{var}` must be a port number, got {value:?}")]
    InvalidPort { var: &'static str, value: String },

    #[error("`CACHE_BACKEND` must be `redis` or `memory`, got {0:?}")]
    UnknownCacheBackend(String),
}

/// Which [`Cache`](crate::cache::Cache) implementation the binary wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    #[default]
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::UnknownCacheBackend(s.to_owned())),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub redis_host: String,
    pub redis_port: u16,
    pub host: String,
    pub port: u16,
    pub cache_backend: CacheBackend,
    pub maps_base_url: Option<String>,
}

// The API key stays out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("redis_host", &self.redis_host)
            .field("redis_port", &self.redis_port)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cache_backend", &self.cache_backend)
            .field("maps_base_url", &self.maps_base_url)
            .finish()
    }
}

impl Config {
    /// Reads `.env` (if any) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenv::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!(?config, "configuration loaded");
        Ok(config)
    }

    /// Builds a config from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = var(API_KEY_VAR).ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            api_key,
            redis_host: var("REDIS_HOST").unwrap_or_else(|| DEFAULT_REDIS_HOST.to_owned()),
            redis_port: parse_port("REDIS_PORT", var("REDIS_PORT"), DEFAULT_REDIS_PORT)?,
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: parse_port("PORT", var("PORT"), DEFAULT_PORT)?,
            cache_backend: var("CACHE_BACKEND")
                .map(|raw| raw.parse::<CacheBackend>())
                .transpose()?
                .unwrap_or_default(),
            maps_base_url: var("GMAP_BASE_URL"),
        })
    }

    /// Connection URL for the Redis backend.
    pub fn redis_url(&self) -> String {
        if self.redis_host.starts_with("redis://") || self.redis_host.starts_with("rediss://") {
            self.redis_host.clone()
        } else {
            format!("redis://{}:{}/", self.redis_host, self.redis_port)
        }
    }

    /// `host:port` to bind the listener to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(var: &'static str, raw: Option<String>, default: u16) -> Result<u16, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPort { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn api_key_is_required() {
        assert_eq!(config(&[]), Err(ConfigError::MissingApiKey));
        assert_eq!(config(&[(API_KEY_VAR, "  ")]), Err(ConfigError::MissingApiKey));
        assert_eq!(
            ConfigError::MissingApiKey.to_string(),
            "You need to pass api key as `GMAP_API_KEY` env variable"
        );
    }

    #[test]
    fn defaults() {
        let c = config(&[(API_KEY_VAR, "k")]).unwrap();
        assert_eq!(c.api_key, "k");
        assert_eq!(c.port, 3000);
        assert_eq!(c.listen_addr(), "0.0.0.0:3000");
        assert_eq!(c.redis_url(), "redis://localhost:6379/");
        assert_eq!(c.cache_backend, CacheBackend::Redis);
        assert_eq!(c.maps_base_url, None);
    }

    #[test]
    fn overrides() {
        let c = config(&[
            (API_KEY_VAR, "k"),
            ("PORT", "8080"),
            ("HOST", "127.0.0.1"),
            ("REDIS_HOST", "cache.internal"),
            ("REDIS_PORT", "6380"),
            ("CACHE_BACKEND", "Memory"),
            ("GMAP_BASE_URL", "http://localhost:9999"),
        ])
        .unwrap();
        assert_eq!(c.listen_addr(), "127.0.0.1:8080");
        assert_eq!(c.redis_url(), "redis://cache.internal:6380/");
        assert_eq!(c.cache_backend, CacheBackend::Memory);
        assert_eq!(c.maps_base_url.as_deref(), Some("http://localhost:9999"));
    }

    #[test]
    fn redis_host_may_be_a_url() {
        let c = config(&[(API_KEY_VAR, "k"), ("REDIS_HOST", "redis://:pw@cache:6379/2")]).unwrap();
        assert_eq!(c.redis_url(), "redis://:pw@cache:6379/2");
    }

    #[test]
    fn bad_values_are_rejected() {
        assert_eq!(
            config(&[(API_KEY_VAR, "k"), ("PORT", "http")]),
            Err(ConfigError::InvalidPort {
                var: "PORT",
                value: "http".to_owned()
            })
        );
        assert_eq!(
            config(&[(API_KEY_VAR, "k"), ("CACHE_BACKEND", "memcached")]),
            Err(ConfigError::UnknownCacheBackend("memcached".to_owned()))
        );
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let c = config(&[(API_KEY_VAR, "super-secret")]).unwrap();
        assert!(!format!("{c:?}").contains("super-secret"));
    }
}
