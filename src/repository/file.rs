//! File-backed repository.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tempfile::NamedTempFile;

use crate::config::RepositoryConfig;
use crate::observability::metrics;
use crate::registry::{Configuration, RegistrySnapshot};
use crate::repository::format::RepositoryRecord;
use crate::repository::watcher::{ConfigWatcher, WatchHandle};
use crate::repository::{ConfigurationRepository, RepositoryError, RepositoryState};

enum WatchState {
    Idle,
    Watching(WatchHandle),
    Closed,
}

/// Contents this process last wrote to or read from the repository file.
/// Holding the lock serializes file access between persists and the watcher.
pub(crate) type LastSynced = Arc<Mutex<Option<RegistrySnapshot>>>;

/// Stores the registry as one JSON file.
pub struct FileRepository {
    config: RepositoryConfig,
    path: PathBuf,
    watch: Mutex<WatchState>,
    synced: LastSynced,
}

impl FileRepository {
    pub fn new(config: RepositoryConfig) -> Self {
        let path = config.file_path();
        Self {
            config,
            path,
            watch: Mutex::new(WatchState::Idle),
            synced: Arc::new(Mutex::new(None)),
        }
    }

    /// Location of the repository file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> RepositoryState {
        match *self.watch.lock().unwrap_or_else(PoisonError::into_inner) {
            WatchState::Idle => RepositoryState::Idle,
            WatchState::Watching(_) => RepositoryState::Watching,
            WatchState::Closed => RepositoryState::Closed,
        }
    }

    fn start_watching(&self, configuration: &Arc<Configuration>) -> Result<(), RepositoryError> {
        let mut state = self.watch.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, WatchState::Closed) {
            tracing::debug!(path = %self.path.display(), "Repository closed, not watching");
            return Ok(());
        }

        fs::create_dir_all(&self.config.dir).map_err(|source| RepositoryError::Io {
            path: self.config.dir.clone(),
            source,
        })?;

        if let WatchState::Watching(previous) = std::mem::replace(&mut *state, WatchState::Idle) {
            previous.stop();
        }

        let handle = ConfigWatcher::new(
            &self.path,
            Arc::clone(configuration),
            Arc::clone(&self.synced),
            &self.config,
        )
        .run()?;
        *state = WatchState::Watching(handle);
        Ok(())
    }
}

impl ConfigurationRepository for FileRepository {
    fn persist(&self, configuration: &Configuration) -> Result<(), RepositoryError> {
        let mut synced = self.synced.lock().unwrap_or_else(PoisonError::into_inner);
        // Taken under the lock so the last rename carries the newest contents.
        let snapshot = configuration.snapshot();
        let result = write_snapshot(&self.path, &snapshot);
        metrics::record_persist(result.is_ok());
        result?;
        *synced = Some(RegistrySnapshot::clone(&snapshot));
        tracing::debug!(path = %self.path.display(), "Registry persisted");
        Ok(())
    }

    fn load(&self) -> Result<Arc<Configuration>, RepositoryError> {
        let stored = {
            let mut synced = self.synced.lock().unwrap_or_else(PoisonError::into_inner);
            let stored = read_snapshot(&self.path)?;
            *synced = stored.clone();
            stored
        };
        let snapshot = match stored {
            Some(snapshot) => snapshot,
            None => {
                tracing::info!(path = %self.path.display(), "No repository file, starting with an empty registry");
                RegistrySnapshot::default()
            }
        };

        tracing::info!(
            path = %self.path.display(),
            containers = snapshot.hosts_per_container.len(),
            servers = snapshot.hosts_per_server.len(),
            "Registry loaded"
        );

        let configuration = Arc::new(Configuration::from_snapshot(snapshot));
        if self.config.watcher_enabled {
            self.start_watching(&configuration)?;
        }
        Ok(configuration)
    }

    fn clean(&self) -> Result<(), RepositoryError> {
        let mut synced = self.synced.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(RepositoryError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        }
        *synced = None;
        Ok(())
    }

    fn close(&self) {
        let mut state = self.watch.lock().unwrap_or_else(PoisonError::into_inner);
        if let WatchState::Watching(handle) = std::mem::replace(&mut *state, WatchState::Closed) {
            handle.stop();
        }
    }
}

impl Drop for FileRepository {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read and rebuild the snapshot stored at `path`. `Ok(None)` if the file
/// does not exist.
pub fn read_snapshot(path: &Path) -> Result<Option<RegistrySnapshot>, RepositoryError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(RepositoryError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let record: RepositoryRecord =
        serde_json::from_slice(&bytes).map_err(|source| RepositoryError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

    record
        .into_snapshot()
        .map(Some)
        .map_err(|invalid| RepositoryError::InvalidRecord {
            path: path.to_path_buf(),
            reason: invalid.0,
        })
}

/// Atomically replace the file at `path` with `snapshot`.
pub fn write_snapshot(path: &Path, snapshot: &RegistrySnapshot) -> Result<(), RepositoryError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |source: io::Error| RepositoryError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut bytes = serde_json::to_vec_pretty(&RepositoryRecord::from_snapshot(snapshot))
        .map_err(RepositoryError::Serialize)?;
    bytes.push(b'\n');

    fs::create_dir_all(dir).map_err(io_err)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|source| RepositoryError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
