//! The live, shared registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::observability::metrics;
use crate::registry::container_info::ContainerInfo;
use crate::registry::listener::{ConfigurationListener, ListenerId};
use crate::registry::snapshot::{ContainerInfoMap, HostMap, RegistrySnapshot};

type ListenerEntry = (ListenerId, Arc<dyn ConfigurationListener>);

/// Registry of which backend hosts serve which containers and servers.
///
/// Readers load the current [`RegistrySnapshot`] without locking and always
/// see a complete one. Mutators are serialised by a writer lock: each one
/// clones the current snapshot, applies its change and publishes the result
/// in a single store, so multi-map updates (sweeps, reloads) are never
/// observed half done.
pub struct Configuration {
    current: ArcSwap<RegistrySnapshot>,
    writer: Mutex<()>,
    listeners: Mutex<Vec<ListenerEntry>>,
    next_listener_id: AtomicU64,
}

impl Configuration {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::from_snapshot(RegistrySnapshot::default())
    }

    /// Create a registry seeded with `snapshot`.
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
            writer: Mutex::new(()),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// The current contents as one consistent value.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    pub fn hosts_per_container(&self) -> HostMap {
        self.current.load().hosts_per_container.clone()
    }

    pub fn hosts_per_server(&self) -> HostMap {
        self.current.load().hosts_per_server.clone()
    }

    pub fn container_infos_per_container(&self) -> ContainerInfoMap {
        self.current.load().container_infos_per_container.clone()
    }

    /// Hosts for `container_id`; empty when the id is unknown.
    pub fn container_hosts(&self, container_id: &str) -> Vec<String> {
        self.current.load().container_hosts(container_id)
    }

    /// Hosts for `server_id`; empty when the id is unknown.
    pub fn server_hosts(&self, server_id: &str) -> Vec<String> {
        self.current.load().server_hosts(server_id)
    }

    /// Container infos registered under a container id or alias.
    pub fn container_infos(&self, key: &str) -> Vec<ContainerInfo> {
        self.current.load().container_infos(key)
    }

    pub fn add_container_host(&self, container_id: &str, url: &str) {
        self.update(|s| s.add_container_host(container_id, url));
        tracing::debug!(container_id, url, "Container host added");
    }

    pub fn remove_container_host(&self, container_id: &str, url: &str) {
        let removed = self.update(|s| s.remove_container_host(container_id, url));
        tracing::debug!(container_id, url, removed, "Container host removed");
    }

    pub fn add_server_host(&self, server_id: &str, url: &str) {
        self.update(|s| s.add_server_host(server_id, url));
        tracing::debug!(server_id, url, "Server host added");
    }

    pub fn remove_server_host(&self, server_id: &str, url: &str) {
        let removed = self.update(|s| s.remove_server_host(server_id, url));
        tracing::debug!(server_id, url, removed, "Server host removed");
    }

    pub fn add_container_info(&self, info: &ContainerInfo) {
        self.update(|s| s.add_container_info(info));
        tracing::debug!(
            container_id = %info.container_id,
            alias = %info.alias,
            release_id = %info.release_id,
            "Container info added"
        );
    }

    pub fn remove_container_info(&self, info: &ContainerInfo) {
        let removed = self.update(|s| s.remove_container_info(info));
        tracing::debug!(
            container_id = %info.container_id,
            alias = %info.alias,
            removed,
            "Container info removed"
        );
    }

    /// Register a deployment in one step (see
    /// [`RegistrySnapshot::register_deployment`]).
    pub fn register_deployment(&self, info: &ContainerInfo, server_id: &str, url: &str) {
        self.update(|s| s.register_deployment(info, server_id, url));
        tracing::info!(
            container_id = %info.container_id,
            alias = %info.alias,
            server_id,
            url,
            "Deployment registered"
        );
    }

    pub fn unregister_deployment(&self, info: &ContainerInfo, server_id: &str, url: &str) {
        self.update(|s| s.unregister_deployment(info, server_id, url));
        tracing::info!(
            container_id = %info.container_id,
            alias = %info.alias,
            server_id,
            url,
            "Deployment unregistered"
        );
    }

    /// Purge the host that `url` belongs to from every container and server
    /// list. `url` may be the host itself or any longer request URL under it.
    ///
    /// Returns the host that was removed.
    pub fn remove_unavailable_server(&self, url: &str) -> Option<String> {
        let removed = self.update(|s| s.remove_unavailable_server(url));
        match &removed {
            Some(host) => {
                metrics::record_unavailable_sweep(true);
                tracing::info!(url, host = %host, "Removed unavailable server from registry");
            }
            None => {
                metrics::record_unavailable_sweep(false);
                tracing::debug!(url, "No registered host matches unavailable url");
            }
        }
        removed
    }

    /// Replace this registry's contents with `other`'s, keeping this
    /// registry's listeners, then notify them.
    pub fn reload_from(&self, other: &Configuration) {
        let incoming = RegistrySnapshot::clone(&other.current.load());
        self.reload_from_snapshot(incoming);
    }

    /// Replace the whole contents with `snapshot` and notify listeners.
    ///
    /// Ids absent from `snapshot` disappear; ids present in both take the
    /// incoming lists verbatim.
    pub fn reload_from_snapshot(&self, snapshot: RegistrySnapshot) {
        self.publish(snapshot);
        self.notify_reloaded();
    }

    /// Replace the whole contents with `snapshot` without notifying.
    /// Callers follow up with [`Configuration::notify_reloaded`].
    pub(crate) fn publish(&self, snapshot: RegistrySnapshot) {
        let published = {
            let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            let published = Arc::new(snapshot);
            self.current.store(Arc::clone(&published));
            published
        };

        metrics::record_registry_size(&published);
        metrics::record_reload();
        tracing::info!(
            containers = published.hosts_per_container.len(),
            servers = published.hosts_per_server.len(),
            container_infos = published.container_infos_per_container.len(),
            "Configuration reloaded"
        );
    }

    /// Register a listener for reload notifications.
    pub fn add_listener(&self, listener: Arc<dyn ConfigurationListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Deregister a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn update<R>(&self, apply: impl FnOnce(&mut RegistrySnapshot) -> R) -> R {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = RegistrySnapshot::clone(&self.current.load());
        let result = apply(&mut next);
        metrics::record_registry_size(&next);
        self.current.store(Arc::new(next));
        result
    }

    /// Call every listener with the contents current at the moment of the
    /// call, so a callback never sees a snapshot older than one published
    /// before it started.
    pub(crate) fn notify_reloaded(&self) {
        // Copy out so listeners may add or remove listeners themselves.
        let listeners: Vec<Arc<dyn ConfigurationListener>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            let current = self.current.load_full();
            listener.on_configuration_reloaded(&current);
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("snapshot", &self.current.load())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const HOST_A: &str = "http://localhost:8080/server";
    const HOST_B: &str = "http://localhost:8180/server";

    fn test_info() -> ContainerInfo {
        ContainerInfo::new("v1", "test", "g:a:v1".parse().unwrap())
    }

    fn counting_listener(counter: Arc<AtomicUsize>) -> Arc<dyn ConfigurationListener> {
        Arc::new(move |_: &RegistrySnapshot| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_register_container_and_server() {
        let config = Configuration::new();
        config.add_container_host("container1", HOST_A);
        config.add_server_host("server1", HOST_A);
        config.add_container_info(&test_info());

        let containers = config.hosts_per_container();
        let servers = config.hosts_per_server();
        assert_eq!(containers.len(), 1);
        assert_eq!(servers.len(), 1);
        assert_eq!(containers["container1"].len(), 1);
        assert_eq!(servers["server1"].len(), 1);
        assert_eq!(config.container_infos("test"), vec![test_info()]);
        assert_eq!(config.container_infos("v1"), vec![test_info()]);
    }

    #[test]
    fn test_unavailable_server_empties_lists() {
        let config = Configuration::new();
        config.add_container_host("container1", HOST_A);
        config.add_server_host("server1", HOST_A);
        config.add_container_info(&test_info());

        assert_eq!(config.remove_unavailable_server(HOST_A), Some(HOST_A.to_string()));

        let containers = config.hosts_per_container();
        let servers = config.hosts_per_server();
        assert_eq!(containers.len(), 1);
        assert_eq!(servers.len(), 1);
        assert!(containers["container1"].is_empty());
        assert!(servers["server1"].is_empty());
    }

    #[test]
    fn test_unavailable_server_from_request_url() {
        let config = Configuration::new();
        config.add_container_host("container1", HOST_A);
        config.add_container_host("container1", HOST_B);
        config.add_server_host("server2", HOST_B);

        config.remove_unavailable_server("http://localhost:8180/server/containers/instances/1");

        assert_eq!(config.container_hosts("container1"), vec![HOST_A.to_string()]);
        assert!(config.server_hosts("server2").is_empty());
    }

    #[test]
    fn test_reload_replaces_servers_and_containers() {
        let config = Configuration::new();
        config.add_container_host("container1", HOST_A);
        config.add_server_host("server1", HOST_A);

        let other = Configuration::new();
        other.add_container_host("container2", HOST_B);
        other.add_server_host("server2", HOST_B);

        config.reload_from(&other);

        let containers = config.hosts_per_container();
        let servers = config.hosts_per_server();
        assert_eq!(containers.len(), 1);
        assert_eq!(servers.len(), 1);
        assert!(!containers.contains_key("container1"));
        assert!(!servers.contains_key("server1"));
        assert_eq!(config.container_hosts("container2"), vec![HOST_B.to_string()]);
        assert_eq!(config.server_hosts("server2"), vec![HOST_B.to_string()]);
    }

    #[test]
    fn test_reload_replaces_lists_without_union() {
        let config = Configuration::new();
        config.add_container_host("container1", HOST_A);
        config.add_container_host("container1", HOST_B);

        let other = Configuration::new();
        other.add_container_host("container1", HOST_B);
        other.add_container_host("container1", "http://localhost:8280/server");

        config.reload_from(&other);

        assert_eq!(
            config.container_hosts("container1"),
            vec![HOST_B.to_string(), "http://localhost:8280/server".to_string()]
        );
    }

    #[test]
    fn test_reload_keeps_own_listeners_and_notifies() {
        let config = Configuration::new();
        let counter = Arc::new(AtomicUsize::new(0));
        config.add_listener(counting_listener(counter.clone()));

        let other = Configuration::new();
        let other_counter = Arc::new(AtomicUsize::new(0));
        other.add_listener(counting_listener(other_counter.clone()));
        other.add_container_host("container2", HOST_B);

        config.reload_from(&other);
        config.reload_from(&other);

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(other_counter.load(Ordering::SeqCst), 0);
        assert_eq!(config.listener_count(), 1);
    }

    #[test]
    fn test_incremental_mutations_do_not_notify() {
        let config = Configuration::new();
        let counter = Arc::new(AtomicUsize::new(0));
        config.add_listener(counting_listener(counter.clone()));

        config.add_container_host("container1", HOST_A);
        config.remove_unavailable_server(HOST_A);

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove_listener() {
        let config = Configuration::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = config.add_listener(counting_listener(counter.clone()));

        assert!(config.remove_listener(id));
        assert!(!config.remove_listener(id));

        config.reload_from_snapshot(RegistrySnapshot::default());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_may_mutate_registry() {
        let config = Arc::new(Configuration::new());
        let weak = Arc::downgrade(&config);
        config.add_listener(Arc::new(move |snapshot: &RegistrySnapshot| {
            if let Some(config) = weak.upgrade() {
                // Re-entrant mutation from inside the callback must not deadlock.
                if snapshot.container_hosts("marker").is_empty() {
                    config.add_container_host("marker", HOST_A);
                }
            }
        }));

        config.reload_from_snapshot(RegistrySnapshot::default());

        assert_eq!(config.container_hosts("marker"), vec![HOST_A.to_string()]);
    }

    #[test]
    fn test_listener_sees_reloaded_snapshot() {
        let config = Configuration::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        config.add_listener(Arc::new(move |snapshot: &RegistrySnapshot| {
            sink.lock().unwrap().push(snapshot.container_hosts("container1"));
        }));

        let mut snapshot = RegistrySnapshot::default();
        snapshot.add_container_host("container1", HOST_B);
        config.reload_from_snapshot(snapshot);

        assert_eq!(*seen.lock().unwrap(), vec![vec![HOST_B.to_string()]]);
    }

    #[test]
    fn test_listener_receives_current_contents() {
        let config = Arc::new(Configuration::new());
        let weak = Arc::downgrade(&config);
        config.add_listener(Arc::new(move |_: &RegistrySnapshot| {
            if let Some(config) = weak.upgrade() {
                config.add_container_host("marker", HOST_A);
            }
        }));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        config.add_listener(Arc::new(move |snapshot: &RegistrySnapshot| {
            sink.lock().unwrap().push(snapshot.container_hosts("marker"));
        }));

        config.reload_from_snapshot(RegistrySnapshot::default());

        // The second listener runs after the first one's mutation and sees it.
        assert_eq!(*seen.lock().unwrap(), vec![vec![HOST_A.to_string()]]);
    }

    #[test]
    fn test_self_reload_is_safe() {
        let config = Configuration::new();
        config.add_container_host("container1", HOST_A);
        config.reload_from(&config);
        assert_eq!(config.container_hosts("container1"), vec![HOST_A.to_string()]);
    }

    #[test]
    fn test_snapshot_is_stable_across_mutation() {
        let config = Configuration::new();
        config.add_container_host("container1", HOST_A);
        let before = config.snapshot();

        config.add_container_host("container1", HOST_B);

        assert_eq!(before.container_hosts("container1").len(), 1);
        assert_eq!(config.container_hosts("container1").len(), 2);
    }
}
