//! Server configuration.
//!
//! Values come from built-in defaults, then an optional YAML file named by
//! `EXPENSE_TRACKER_CONFIG`, then individual environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::storage::CsvConnection;

pub const CONFIG_FILE_ENV: &str = "EXPENSE_TRACKER_CONFIG";
pub const BIND_ENV: &str = "EXPENSE_TRACKER_BIND";
pub const DATA_DIR_ENV: &str = "EXPENSE_TRACKER_DATA_DIR";
pub const CORS_ORIGIN_ENV: &str = "EXPENSE_TRACKER_CORS_ORIGIN";
pub const LOG_ENV: &str = "EXPENSE_TRACKER_LOG";
pub const STATIC_DIR_ENV: &str = "EXPENSE_TRACKER_STATIC_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_address: SocketAddr,
    /// Directory holding expenses.csv and accounts.csv
    pub data_directory: PathBuf,
    /// Origin allowed to call the API from a browser
    pub cors_origin: String,
    /// `tracing` filter directive, used when RUST_LOG is not set
    pub log_filter: String,
    /// Built frontend to serve for non-API paths
    pub static_directory: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_directory: CsvConnection::default_directory(),
            cors_origin: "http://localhost:8080".to_string(),
            log_filter: "info".to_string(),
            static_directory: None,
        }
    }
}

impl AppConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_FILE_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(bind) = lookup(BIND_ENV) {
            config.bind_address = bind
                .parse()
                .with_context(|| format!("{} is not a socket address: {}", BIND_ENV, bind))?;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            config.data_directory = PathBuf::from(dir);
        }
        if let Some(origin) = lookup(CORS_ORIGIN_ENV) {
            config.cors_origin = origin;
        }
        if let Some(filter) = lookup(LOG_ENV) {
            config.log_filter = filter;
        }
        if let Some(dir) = lookup(STATIC_DIR_ENV) {
            config.static_directory = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}
