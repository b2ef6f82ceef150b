//! Demo configuration with TOML file support.
//!
//! ```toml
//! link_base = "http://localhost:8080/"
//!
//! [sync]
//! heartbeat_interval_ms = 400
//!
//! [log]
//! format = "json"
//! level = "debug,tabmesh_core=trace"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tabmesh_core::SyncConfig;

use crate::logging::LogFormat;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Human,
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Page the printed room link points at.
    pub link_base: String,
    pub sync: SyncConfig,
    pub log: LogConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            link_base: "http://localhost:8080/".to_string(),
            sync: SyncConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl DemoConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}
