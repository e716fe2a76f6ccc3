//! Startup wiring.
//!
//! Opens the repository, loads the registry (starting the file watcher when
//! enabled) and attaches the reload listener that keeps logs and metrics in
//! step with file-driven reloads.

use std::sync::Arc;

use crate::config::RepositoryConfig;
use crate::observability::metrics;
use crate::registry::{Configuration, ConfigurationListener, RegistrySnapshot};
use crate::repository::{ConfigurationRepository, FileRepository, RepositoryError};

/// Logs every reload with the new registry sizes.
#[derive(Debug, Default)]
pub struct ReloadLogger;

impl ConfigurationListener for ReloadLogger {
    fn on_configuration_reloaded(&self, snapshot: &RegistrySnapshot) {
        metrics::record_registry_size(snapshot);
        tracing::info!(
            containers = snapshot.hosts_per_container.len(),
            servers = snapshot.hosts_per_server.len(),
            host_entries = snapshot.host_entry_count(),
            "Registry now serving reloaded configuration"
        );
    }
}

/// Open the repository and load the live registry from it.
pub fn open_registry(
    config: &RepositoryConfig,
) -> Result<(Arc<FileRepository>, Arc<Configuration>), RepositoryError> {
    let repository = Arc::new(FileRepository::new(config.clone()));
    let configuration = repository.load()?;
    configuration.add_listener(Arc::new(ReloadLogger));

    tracing::info!(
        path = %repository.path().display(),
        watching = config.watcher_enabled,
        "Registry ready"
    );
    Ok((repository, configuration))
}
