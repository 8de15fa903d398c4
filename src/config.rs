use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

use crate::http::parser::ReadLimits;

static CONFIG: OnceCell<ServerConfig> = OnceCell::new();

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,

    /// Bytes requested per read while parsing a request.
    pub read_size: usize,
    pub initial_buffer_size: usize,
    pub max_buffer_size: usize,

    pub log_level: String,

    /// Directory the demo handler serves media from.
    pub assets_root: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let limits = ReadLimits::default();
        Self {
            address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 42069,

            read_size: limits.read_size,
            initial_buffer_size: limits.initial_buffer_size,
            max_buffer_size: limits.max_buffer_size,

            log_level: "info".to_string(),

            assets_root: "./assets".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to deserialize {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl ServerConfig {
    /// Loads `path`, falling back to the defaults when it cannot be read or parsed.
    pub fn from_file(path: &str) -> Self {
        Self::load(path).unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to default config");
            ServerConfig::default()
        })
    }

    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<ServerConfig>(content)
    }

    pub fn read_limits(&self) -> ReadLimits {
        ReadLimits {
            read_size: self.read_size,
            initial_buffer_size: self.initial_buffer_size,
            max_buffer_size: self.max_buffer_size,
        }
    }
}

/// Installs the process-wide configuration. Returns `false` if one was already set.
pub fn set_config(cfg: ServerConfig) -> bool {
    CONFIG.set(cfg).is_ok()
}

/// The process-wide configuration, or the defaults when none was installed.
pub fn config() -> &'static ServerConfig {
    CONFIG.get_or_init(ServerConfig::default)
}
