//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from a TOML file; every
//! field has a default so an empty file (or no file) is a valid config.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the router.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Management API listener.
    pub listener: ListenerConfig,

    /// Where the registry is persisted and whether it is watched.
    pub repository: RepositoryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
        }
    }
}

/// Repository configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Directory holding the repository file.
    pub dir: PathBuf,

    /// File name inside `dir`.
    pub file_name: String,

    /// Reload the registry when the file changes on disk.
    pub watcher_enabled: bool,

    /// Poll interval for platforms without native change notification.
    pub watcher_interval_ms: u64,

    /// Quiet period that collapses a burst of change events into one reload.
    pub watcher_debounce_ms: u64,
}

impl RepositoryConfig {
    /// Repository rooted at `dir` with every other setting defaulted.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Full path of the repository file.
    pub fn file_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            file_name: "kie-server-router.json".to_string(),
            watcher_enabled: false,
            watcher_interval_ms: 5000,
            watcher_debounce_ms: 200,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
