//! Configuration file support for genread
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional JSON file (any subset of fields), and `GENREAD_*` environment
//! variables.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "GENREAD_";

/// Default config file looked up when none is given
pub const DEFAULT_CONFIG_FILE: &str = "genread.json";

/// Version label for `date`: `v` followed by the day of month (`v22` on the 22nd)
#[must_use]
pub fn version_for_date(date: NaiveDate) -> String {
    format!("v{}", date.day())
}

/// Connection settings for the backing store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub db: u32,
    pub password: Option<String>,
    pub socket_timeout_secs: f64,
    pub connect_timeout_secs: f64,
    /// Upper bound on idle pooled connections
    pub max_connections: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
            socket_timeout_secs: 5.0,
            connect_timeout_secs: 5.0,
            max_connections: 50,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.socket_timeout_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.connect_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.host.is_empty() {
            return Err(StoreError::config("store host must not be empty"));
        }
        if !(self.socket_timeout_secs > 0.0 && self.socket_timeout_secs.is_finite()) {
            return Err(StoreError::config("socket_timeout_secs must be positive"));
        }
        if !(self.connect_timeout_secs > 0.0 && self.connect_timeout_secs.is_finite()) {
            return Err(StoreError::config("connect_timeout_secs must be positive"));
        }
        if self.max_connections == 0 {
            return Err(StoreError::config("max_connections must be at least 1"));
        }
        Ok(())
    }
}

/// Reader (benchmark) defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub primary_version: String,
    pub fallback_version: String,
    pub progress_interval_secs: u64,
    pub join_timeout_secs: u64,
    /// Number of identifiers sampled from the network blocks
    pub pool_size: usize,
    /// Lookups per pipelined round-trip; 1 disables pipelining
    pub batch_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            primary_version: "v23".to_string(),
            fallback_version: "v22".to_string(),
            progress_interval_secs: 5,
            join_timeout_secs: 10,
            pool_size: 10_000,
            batch_size: 1,
        }
    }
}

/// Network blocks the key universe is sampled from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub blocks: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            blocks: vec![
                "8.8.8.0/24".to_string(),
                "1.1.1.0/24".to_string(),
                "208.67.222.0/24".to_string(),
            ],
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub reader: ReaderConfig,
    pub network: NetworkConfig,
    /// Generation label the importer writes today
    pub version: String,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            reader: ReaderConfig::default(),
            network: NetworkConfig::default(),
            version: version_for_date(chrono::Local::now().date_naive()),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads defaults, then `path` (or `genread.json`), then the environment
    ///
    /// A missing file is not an error and leaves the defaults in place; a
    /// file that exists but is unreadable or malformed is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_optional_file(path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_optional_file(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        if path.exists() {
            return Self::load_from_file(path);
        }
        if path != Path::new(DEFAULT_CONFIG_FILE) {
            warn!("Config file {} not found, using defaults", path.display());
        }
        Ok(Self::default())
    }

    /// Load configuration from a JSON file; absent fields keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        info!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Applies `GENREAD_*` overrides looked up through `lookup`
    ///
    /// Values that fail to parse are skipped with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));

        if let Some(v) = var("STORE_HOST") {
            self.store.host = v;
        }
        if let Some(v) = var("STORE_PORT") {
            match v.parse() {
                Ok(port) => self.store.port = port,
                Err(e) => warn!("Invalid {ENV_PREFIX}STORE_PORT={v}: {e}"),
            }
        }
        if let Some(v) = var("STORE_DB") {
            match v.parse() {
                Ok(db) => self.store.db = db,
                Err(e) => warn!("Invalid {ENV_PREFIX}STORE_DB={v}: {e}"),
            }
        }
        if let Some(v) = var("STORE_PASSWORD") {
            self.store.password = Some(v).filter(|p| !p.is_empty());
        }
        if let Some(v) = var("READER_PRIMARY") {
            self.reader.primary_version = v;
        }
        if let Some(v) = var("READER_FALLBACK") {
            self.reader.fallback_version = v;
        }
        if let Some(v) = var("VERSION") {
            self.version = v;
        }
        if let Some(v) = var("LOG_LEVEL") {
            self.log_level = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;

        if self.network.blocks.is_empty() {
            anyhow::bail!("At least one network block must be configured");
        }
        if self.reader.pool_size == 0 {
            anyhow::bail!("reader.pool_size must be at least 1");
        }
        if self.reader.batch_size == 0 {
            anyhow::bail!("reader.batch_size must be at least 1");
        }

        Ok(())
    }
}
