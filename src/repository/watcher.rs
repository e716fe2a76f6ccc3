//! Repository file watcher for hot reload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::RepositoryConfig;
use crate::observability::metrics;
use crate::registry::{Configuration, RegistrySnapshot};
use crate::repository::file::{read_snapshot, LastSynced};
use crate::repository::RepositoryError;

enum WatchMessage {
    Changed,
    Shutdown,
}

/// Follows the repository file and reloads a live registry from it.
pub struct ConfigWatcher {
    path: PathBuf,
    configuration: Arc<Configuration>,
    synced: LastSynced,
    poll_interval: Duration,
    debounce: Duration,
}

impl ConfigWatcher {
    /// `synced` is shared with the repository that writes `path`; contents
    /// matching it are this process's own and never reloaded.
    pub(crate) fn new(
        path: &Path,
        configuration: Arc<Configuration>,
        synced: LastSynced,
        settings: &RepositoryConfig,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            configuration,
            synced,
            poll_interval: Duration::from_millis(settings.watcher_interval_ms),
            debounce: Duration::from_millis(settings.watcher_debounce_ms),
        }
    }

    /// Start watching on a background thread.
    ///
    /// The parent directory is watched rather than the file itself, since
    /// atomic replaces swap the file out from under a file-level watch.
    pub fn run(self) -> Result<WatchHandle, RepositoryError> {
        let (tx, rx) = mpsc::channel();

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name: OsString = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();

        let event_tx = tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_modify()
                        || event.kind.is_create()
                        || event.kind.is_remove())
                        && event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if relevant {
                        let _ = event_tx.send(WatchMessage::Changed);
                    }
                }
                Err(e) => {
                    metrics::record_watch_error();
                    tracing::error!(error = ?e, "Watch error");
                }
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let path = self.path.clone();
        let thread = thread::Builder::new()
            .name("kie-router-watcher".to_string())
            .spawn(move || {
                watch_loop(&self.path, &self.configuration, &self.synced, rx, self.debounce)
            })
            .map_err(|source| RepositoryError::Io {
                path: path.clone(),
                source,
            })?;

        // Catch anything written between the initial load and the watch.
        let _ = tx.send(WatchMessage::Changed);

        tracing::info!(path = %path.display(), "Repository watcher started");
        Ok(WatchHandle {
            watcher: Some(watcher),
            tx,
            thread: Some(thread),
            path,
        })
    }
}

/// Running watcher. Stopping (or dropping) it joins the background thread;
/// no reload happens after that returns.
pub struct WatchHandle {
    watcher: Option<RecommendedWatcher>,
    tx: Sender<WatchMessage>,
    thread: Option<JoinHandle<()>>,
    path: PathBuf,
}

impl WatchHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Drop the notify watcher first so no new events arrive.
        self.watcher.take();
        let _ = self.tx.send(WatchMessage::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!(path = %self.path.display(), "Repository watcher thread panicked");
            }
            tracing::info!(path = %self.path.display(), "Repository watcher stopped");
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn watch_loop(
    path: &Path,
    configuration: &Configuration,
    synced: &Mutex<Option<RegistrySnapshot>>,
    rx: Receiver<WatchMessage>,
    debounce: Duration,
) {
    while let Ok(message) = rx.recv() {
        match message {
            WatchMessage::Shutdown => return,
            WatchMessage::Changed => {
                if !settle(&rx, debounce) {
                    return;
                }
                reload_if_changed(path, configuration, synced);
            }
        }
    }
}

/// Wait until no change event has arrived for `debounce`. Returns false if
/// shutdown was requested meanwhile.
fn settle(rx: &Receiver<WatchMessage>, debounce: Duration) -> bool {
    loop {
        match rx.recv_timeout(debounce) {
            Ok(WatchMessage::Changed) => continue,
            Ok(WatchMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => return false,
            Err(RecvTimeoutError::Timeout) => return true,
        }
    }
}

fn reload_if_changed(path: &Path, configuration: &Configuration, synced: &Mutex<Option<RegistrySnapshot>>) {
    if publish_if_changed(path, configuration, synced) {
        configuration.notify_reloaded();
    }
}

/// Publish the file's contents if they came from outside this process.
/// Returns whether a reload was published. Listeners are left to the caller
/// so they run without the sync lock held.
fn publish_if_changed(
    path: &Path,
    configuration: &Configuration,
    synced: &Mutex<Option<RegistrySnapshot>>,
) -> bool {
    let mut last_synced = synced.lock().unwrap_or_else(PoisonError::into_inner);
    match read_snapshot(path) {
        Ok(Some(snapshot)) => {
            if last_synced.as_ref() == Some(&snapshot) {
                tracing::debug!(path = %path.display(), "Repository file matches last sync, skipping reload");
                return false;
            }
            if *configuration.snapshot() == snapshot {
                tracing::debug!(path = %path.display(), "Repository file unchanged, skipping reload");
                *last_synced = Some(snapshot);
                return false;
            }
            tracing::info!(path = %path.display(), "Repository file changed, reloading registry");
            configuration.publish(snapshot.clone());
            *last_synced = Some(snapshot);
            true
        }
        Ok(None) => {
            tracing::warn!(path = %path.display(), "Repository file removed. Keeping current registry.");
            false
        }
        Err(e) => {
            metrics::record_watch_error();
            tracing::warn!(path = %path.display(), error = %e, "Failed to reload repository file. Keeping current registry.");
            false
        }
    }
}
