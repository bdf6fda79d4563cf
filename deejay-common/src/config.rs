//! Bootstrap configuration and database path resolution
//!
//! Bootstrap settings come from a small TOML file. Everything has a built-in
//! default, so a missing file is not an error.
//!
//! # Database path priority
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`DEEJAY_DATABASE`)
//! 3. TOML `database_path`
//! 4. OS-dependent default (`<data dir>/deejay/deejay.db`)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable overriding the database path
pub const DATABASE_ENV_VAR: &str = "DEEJAY_DATABASE";

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "DEEJAY_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Path to SQLite database file (relative or absolute)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Persistence behaviour
    #[serde(default)]
    pub store: StoreSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Settings for the upsert-and-link store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreSettings {
    /// Upper bound for a single upsert/link/DDL operation
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Maximum total time spent retrying an operation on "database is locked"
    #[serde(default = "default_max_lock_wait_ms")]
    pub max_lock_wait_ms: u64,

    /// Create natural-key unique indexes as part of `create_all`
    #[serde(default)]
    pub unique_indexes: bool,

    /// Records ingested in parallel (1 = serialized single writer)
    #[serde(default = "default_ingest_concurrency")]
    pub ingest_concurrency: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            operation_timeout_ms: default_operation_timeout_ms(),
            max_lock_wait_ms: default_max_lock_wait_ms(),
            unique_indexes: false,
            ingest_concurrency: default_ingest_concurrency(),
        }
    }
}

impl StoreSettings {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Validate values that would make the store unusable
    pub fn validate(&self) -> Result<()> {
        if self.operation_timeout_ms == 0 {
            return Err(Error::Config(
                "store.operation_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.ingest_concurrency == 0 {
            return Err(Error::Config(
                "store.ingest_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_operation_timeout_ms() -> u64 {
    10_000
}

fn default_max_lock_wait_ms() -> u64 {
    5_000
}

fn default_ingest_concurrency() -> usize {
    1
}

/// Load TOML bootstrap config from an explicit path
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;
    config.store.validate()?;
    Ok(config)
}

/// Load TOML bootstrap config, falling back to defaults when no file exists
///
/// Lookup order: explicit path → `DEEJAY_CONFIG` → platform config dir.
/// An explicit path (argument or environment) must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return load_toml_config(path);
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return load_toml_config(Path::new(&path));
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            info!("Loading config from {}", path.display());
            load_toml_config(&path)
        }
        _ => {
            debug!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Resolve the database path following the priority order above
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.database_path {
        return path.clone();
    }

    // Priority 4: OS-dependent default
    default_database_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("deejay").join("config.toml"))
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("deejay").join("deejay.db"))
        .unwrap_or_else(|| PathBuf::from("./deejay_data/deejay.db"))
}
