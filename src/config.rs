//! Run configuration
//!
//! Settings load from a YAML file; command-line flags override them.

use crate::migration::{MigrationOptions, DEFAULT_CATALOG_TABLE, DEFAULT_ROOT_OID};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Missing setting: {0}")]
    Missing(&'static str),

    #[error("Unknown log level '{0}'")]
    InvalidLogLevel(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Domain model description (YAML)
    pub model: Option<PathBuf>,
    /// SQLite database to read
    pub source: Option<PathBuf>,
    /// Directory receiving the graph log
    pub output: Option<PathBuf>,
    /// Table mapping class names to class ids
    pub catalog_table: String,
    /// OID of the object linked from the root node
    pub root_oid: i64,
    /// `trace`, `debug`, `info`, `warn` or `error`
    pub log_level: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            model: None,
            source: None,
            output: None,
            catalog_table: DEFAULT_CATALOG_TABLE.to_string(),
            root_oid: DEFAULT_ROOT_OID,
            log_level: "info".to_string(),
        }
    }
}

impl MigrationConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn log_level(&self) -> ConfigResult<Level> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    pub fn model_path(&self) -> ConfigResult<&Path> {
        self.model.as_deref().ok_or(ConfigError::Missing("model"))
    }

    pub fn source_path(&self) -> ConfigResult<&Path> {
        self.source.as_deref().ok_or(ConfigError::Missing("source"))
    }

    pub fn output_path(&self) -> ConfigResult<&Path> {
        self.output.as_deref().ok_or(ConfigError::Missing("output"))
    }

    pub fn options(&self) -> MigrationOptions {
        MigrationOptions {
            catalog_table: self.catalog_table.clone(),
            root_oid: self.root_oid,
        }
    }
}
