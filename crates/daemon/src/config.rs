use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::batch::BatchSettings;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
pub const DEFAULT_DB_PATH: &str = ".records/records.db";
pub const DEFAULT_POOL_SIZE: usize = 10;
pub const DEFAULT_UNIT_DELAY_MS: u64 = 100;
pub const DEFAULT_BATCH_DEADLINE_SECS: u64 = 30;
pub const DEFAULT_LOG: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

/// One source of settings. Unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub listen: Option<String>,
    pub store: Option<StoreBackend>,
    pub db_path: Option<PathBuf>,
    pub pool_size: Option<usize>,
    pub unit_delay_ms: Option<u64>,
    pub batch_deadline_secs: Option<u64>,
    pub log: Option<String>,
}

impl ConfigLayer {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fill every unset field of `self` from `lower`.
    pub fn over(self, lower: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            listen: self.listen.or(lower.listen),
            store: self.store.or(lower.store),
            db_path: self.db_path.or(lower.db_path),
            pool_size: self.pool_size.or(lower.pool_size),
            unit_delay_ms: self.unit_delay_ms.or(lower.unit_delay_ms),
            batch_deadline_secs: self.batch_deadline_secs.or(lower.batch_deadline_secs),
            log: self.log.or(lower.log),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid listen address {0:?}")]
    Listen(String),
    #[error("pool size must be at least 1")]
    ZeroPoolSize,
    #[error("batch deadline must be greater than zero")]
    ZeroDeadline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub listen: SocketAddr,
    pub store: StoreBackend,
    pub db_path: PathBuf,
    pub pool_size: usize,
    pub batch: BatchSettings,
    /// Default `EnvFilter` directive; `RUST_LOG` wins when set.
    pub log: String,
}

impl DaemonConfig {
    /// Apply defaults to whatever `layer` leaves unset and validate the result.
    pub fn resolve(layer: ConfigLayer) -> Result<Self, ConfigError> {
        let listen = layer.listen.unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen: SocketAddr = listen
            .parse()
            .map_err(|_| ConfigError::Listen(listen.clone()))?;

        let pool_size = layer.pool_size.unwrap_or(DEFAULT_POOL_SIZE);
        if pool_size == 0 {
            return Err(ConfigError::ZeroPoolSize);
        }

        let deadline_secs = layer
            .batch_deadline_secs
            .unwrap_or(DEFAULT_BATCH_DEADLINE_SECS);
        if deadline_secs == 0 {
            return Err(ConfigError::ZeroDeadline);
        }

        Ok(Self {
            listen,
            store: layer.store.unwrap_or_default(),
            db_path: layer
                .db_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            pool_size,
            batch: BatchSettings {
                unit_delay: Duration::from_millis(
                    layer.unit_delay_ms.unwrap_or(DEFAULT_UNIT_DELAY_MS),
                ),
                deadline: Duration::from_secs(deadline_secs),
            },
            log: layer.log.unwrap_or_else(|| DEFAULT_LOG.to_string()),
        })
    }
}
