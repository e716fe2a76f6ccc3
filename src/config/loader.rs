//! Configuration loading from disk and the environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Directory holding the repository file.
pub const ENV_REPOSITORY_DIR: &str = "ROUTER_REPOSITORY_DIR";
/// `true`/`false`: reload the registry when the repository file changes.
pub const ENV_WATCHER_ENABLED: &str = "CONFIG_FILE_WATCHER_ENABLED";
/// Watcher poll interval in milliseconds.
pub const ENV_WATCHER_INTERVAL: &str = "CONFIG_FILE_WATCHER_INTERVAL";
/// Management API bind address.
pub const ENV_BIND_ADDRESS: &str = "ROUTER_BIND_ADDRESS";
/// Log level.
pub const ENV_LOG_LEVEL: &str = "ROUTER_LOG_LEVEL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML configuration file without validating it.
pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(mut config: RouterConfig, lookup: F) -> Result<RouterConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(ENV_REPOSITORY_DIR) {
        config.repository.dir = PathBuf::from(dir);
    }

    if let Some(value) = lookup(ENV_WATCHER_ENABLED) {
        config.repository.watcher_enabled = match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                return Err(ConfigError::Env {
                    var: ENV_WATCHER_ENABLED,
                    value,
                })
            }
        };
    }

    if let Some(value) = lookup(ENV_WATCHER_INTERVAL) {
        config.repository.watcher_interval_ms =
            value.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_WATCHER_INTERVAL,
                value: value.clone(),
            })?;
    }

    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    }

    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.observability.log_level = level;
    }

    Ok(config)
}

/// Load the effective configuration: file (or defaults), then process
/// environment, then validation.
pub fn load_effective(path: Option<&Path>) -> Result<RouterConfig, ConfigError> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };
    let config = apply_env_overrides(config, |var| std::env::var(var).ok())?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
