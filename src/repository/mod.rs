//! Registry persistence subsystem.
//!
//! # Data Flow
//! ```text
//! persist(configuration):
//!     snapshot → format.rs (RepositoryRecord, JSON)
//!     → temp file in the same directory → rename over target
//!
//! load():
//!     file → format.rs (parse, rebuild snapshot) → Configuration
//!     → if watching enabled: watcher.rs bound to that Configuration
//!
//! On file change (watching):
//!     notify event → debounce → re-read file (under the sync lock)
//!     → differs from last write/load and from live? publish
//!     → listeners, after the lock is released
//! ```
//!
//! # States
//! ```text
//! Idle ──load() with watcher enabled──▶ Watching ──close()──▶ Closed
//! Idle ─────────────────close()──────────────────────────────▶ Closed
//! ```
//!
//! # Design Decisions
//! - Writes replace the file atomically; readers never see half a write
//! - Persists and watcher reads share one lock; the watcher never reloads
//!   contents this process wrote itself
//! - A missing file loads as an empty registry; a corrupt one is an error
//! - Watch-loop failures are logged and counted, never propagated

pub mod file;
pub mod format;
pub mod watcher;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::registry::Configuration;

pub use file::FileRepository;

/// Errors surfaced by `persist` and `load`.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt repository file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid repository file {}: {reason}", path.display())]
    InvalidRecord { path: PathBuf, reason: String },

    #[error("Failed to serialize registry: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to replace {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),
}

/// Lifecycle of a repository's background watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryState {
    Idle,
    Watching,
    Closed,
}

/// Durable storage for the registry.
pub trait ConfigurationRepository: Send + Sync {
    /// Overwrite the stored registry with `configuration`'s current contents.
    fn persist(&self, configuration: &Configuration) -> Result<(), RepositoryError>;

    /// Read the stored registry. When watching is enabled the returned
    /// registry keeps following changes to the store until `close`.
    fn load(&self) -> Result<Arc<Configuration>, RepositoryError>;

    /// Remove all stored state.
    fn clean(&self) -> Result<(), RepositoryError>;

    /// Stop background watching. Idempotent.
    fn close(&self);
}
