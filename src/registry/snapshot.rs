//! Registry contents as a plain value.
//!
//! All bookkeeping algorithms live here and operate on an owned snapshot;
//! [`Configuration`](super::Configuration) publishes mutated copies.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::registry::container_info::ContainerInfo;

/// Ordered host lists keyed by container or server id.
pub type HostMap = BTreeMap<String, Vec<String>>;

/// Container infos keyed by container id and alias.
pub type ContainerInfoMap = BTreeMap<String, BTreeSet<ContainerInfo>>;

/// One consistent view of the three registry maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    pub hosts_per_container: HostMap,
    pub hosts_per_server: HostMap,
    pub container_infos_per_container: ContainerInfoMap,
}

impl RegistrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_container_host(&mut self, container_id: &str, url: &str) {
        append_host(&mut self.hosts_per_container, container_id, url);
    }

    pub fn remove_container_host(&mut self, container_id: &str, url: &str) -> bool {
        remove_host(&mut self.hosts_per_container, container_id, url)
    }

    pub fn add_server_host(&mut self, server_id: &str, url: &str) {
        append_host(&mut self.hosts_per_server, server_id, url);
    }

    pub fn remove_server_host(&mut self, server_id: &str, url: &str) -> bool {
        remove_host(&mut self.hosts_per_server, server_id, url)
    }

    /// Register `info` under its container id and its alias.
    pub fn add_container_info(&mut self, info: &ContainerInfo) {
        for key in info.registry_keys() {
            self.container_infos_per_container
                .entry(key.to_string())
                .or_default()
                .insert(info.clone());
        }
    }

    /// Remove `info` from every key it was registered under. Keys left with
    /// no infos are dropped.
    pub fn remove_container_info(&mut self, info: &ContainerInfo) -> bool {
        let mut removed = false;
        for key in info.registry_keys() {
            if let Some(infos) = self.container_infos_per_container.get_mut(key) {
                removed |= infos.remove(info);
                if infos.is_empty() {
                    self.container_infos_per_container.remove(key);
                }
            }
        }
        removed
    }

    /// Record that the container described by `info` is deployed on server
    /// `server_id` at `url`: the host is listed under the container id, the
    /// alias and the server, and the info is registered.
    pub fn register_deployment(&mut self, info: &ContainerInfo, server_id: &str, url: &str) {
        for key in info.registry_keys() {
            append_host(&mut self.hosts_per_container, key, url);
        }
        append_host(&mut self.hosts_per_server, server_id, url);
        self.add_container_info(info);
    }

    /// Reverse of [`register_deployment`](Self::register_deployment).
    pub fn unregister_deployment(&mut self, info: &ContainerInfo, server_id: &str, url: &str) {
        for key in info.registry_keys() {
            remove_host(&mut self.hosts_per_container, key, url);
        }
        remove_host(&mut self.hosts_per_server, server_id, url);
        self.remove_container_info(info);
    }

    /// Find the registered host that `url` belongs to.
    ///
    /// Container lists are scanned before server lists, both in key order and
    /// then list order; the first host that is a string prefix of `url` wins.
    pub fn find_host_for(&self, url: &str) -> Option<&str> {
        self.hosts_per_container
            .values()
            .chain(self.hosts_per_server.values())
            .flatten()
            .find(|host| !host.is_empty() && url.starts_with(host.as_str()))
            .map(String::as_str)
    }

    /// Purge the host matching `url` from every container and server list.
    ///
    /// Keys are kept even when their list ends up empty. Returns the host
    /// that was removed, if any matched.
    pub fn remove_unavailable_server(&mut self, url: &str) -> Option<String> {
        let host = self.find_host_for(url)?.to_string();
        for hosts in self
            .hosts_per_container
            .values_mut()
            .chain(self.hosts_per_server.values_mut())
        {
            hosts.retain(|h| *h != host);
        }
        Some(host)
    }

    pub fn container_hosts(&self, container_id: &str) -> Vec<String> {
        self.hosts_per_container
            .get(container_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn server_hosts(&self, server_id: &str) -> Vec<String> {
        self.hosts_per_server
            .get(server_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn container_infos(&self, key: &str) -> Vec<ContainerInfo> {
        self.container_infos_per_container
            .get(key)
            .map(|infos| infos.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every distinct container info, regardless of how many keys hold it.
    pub fn distinct_container_infos(&self) -> BTreeSet<ContainerInfo> {
        self.container_infos_per_container
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    /// Number of container and server host entries, counting duplicates.
    pub fn host_entry_count(&self) -> usize {
        self.hosts_per_container
            .values()
            .chain(self.hosts_per_server.values())
            .map(Vec::len)
            .sum()
    }
}

fn append_host(map: &mut HostMap, id: &str, url: &str) {
    map.entry(id.to_string()).or_default().push(url.to_string());
}

fn remove_host(map: &mut HostMap, id: &str, url: &str) -> bool {
    let Some(hosts) = map.get_mut(id) else {
        return false;
    };
    match hosts.iter().position(|h| h == url) {
        Some(index) => {
            hosts.remove(index);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST_A: &str = "http://localhost:8080/server";
    const HOST_B: &str = "http://localhost:8180/server";

    fn info(id: &str, alias: &str, release: &str) -> ContainerInfo {
        ContainerInfo::new(id, alias, release.parse().unwrap())
    }

    #[test]
    fn test_add_then_remove_restores_list() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.add_container_host("container1", HOST_A);
        snapshot.add_container_host("container1", HOST_B);
        let before = snapshot.container_hosts("container1");

        snapshot.add_container_host("container1", "http://other:8080/server");
        snapshot.remove_container_host("container1", "http://other:8080/server");

        assert_eq!(snapshot.container_hosts("container1"), before);
    }

    #[test]
    fn test_duplicate_hosts_are_kept() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.add_server_host("server1", HOST_A);
        snapshot.add_server_host("server1", HOST_A);
        assert_eq!(snapshot.server_hosts("server1").len(), 2);

        assert!(snapshot.remove_server_host("server1", HOST_A));
        assert_eq!(snapshot.server_hosts("server1"), vec![HOST_A.to_string()]);
    }

    #[test]
    fn test_reinsert_moves_host_to_end() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.add_container_host("container1", HOST_A);
        snapshot.add_container_host("container1", HOST_B);

        snapshot.remove_container_host("container1", HOST_A);
        snapshot.add_container_host("container1", HOST_A);

        assert_eq!(
            snapshot.container_hosts("container1"),
            vec![HOST_B.to_string(), HOST_A.to_string()]
        );
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut snapshot = RegistrySnapshot::new();
        assert!(!snapshot.remove_container_host("missing", HOST_A));
        assert!(!snapshot.remove_server_host("missing", HOST_A));
        assert!(snapshot.hosts_per_container.is_empty());
        assert!(snapshot.container_hosts("missing").is_empty());
    }

    #[test]
    fn test_emptied_list_keeps_key() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.add_container_host("container1", HOST_A);
        snapshot.remove_container_host("container1", HOST_A);

        assert_eq!(snapshot.hosts_per_container.len(), 1);
        assert!(snapshot.hosts_per_container["container1"].is_empty());
    }

    #[test]
    fn test_container_info_registered_under_id_and_alias() {
        let mut snapshot = RegistrySnapshot::new();
        let test = info("test1.0", "test", "org.kie:test:1.0");
        snapshot.add_container_info(&test);

        assert_eq!(snapshot.container_infos_per_container.len(), 2);
        assert_eq!(snapshot.container_infos("test"), vec![test.clone()]);
        assert_eq!(snapshot.container_infos("test1.0"), vec![test.clone()]);

        // Sets: re-adding an equal value changes nothing.
        snapshot.add_container_info(&test);
        assert_eq!(snapshot.container_infos("test").len(), 1);

        assert!(snapshot.remove_container_info(&test));
        assert!(snapshot.container_infos_per_container.is_empty());
        assert!(!snapshot.remove_container_info(&test));
    }

    #[test]
    fn test_alias_groups_multiple_versions() {
        let mut snapshot = RegistrySnapshot::new();
        let v1 = info("test1.0", "test", "org.kie:test:1.0");
        let v2 = info("test1.1", "test", "org.kie:test:1.1");
        snapshot.add_container_info(&v1);
        snapshot.add_container_info(&v2);

        assert_eq!(snapshot.container_infos("test").len(), 2);

        snapshot.remove_container_info(&v1);
        assert_eq!(snapshot.container_infos("test"), vec![v2.clone()]);
        assert!(snapshot.container_infos("test1.0").is_empty());
        assert_eq!(snapshot.distinct_container_infos().len(), 1);
    }

    #[test]
    fn test_register_and_unregister_deployment() {
        let mut snapshot = RegistrySnapshot::new();
        let test = info("test1.0", "test", "org.kie:test:1.0");

        snapshot.register_deployment(&test, "server1", HOST_A);
        assert_eq!(snapshot.container_hosts("test1.0"), vec![HOST_A.to_string()]);
        assert_eq!(snapshot.container_hosts("test"), vec![HOST_A.to_string()]);
        assert_eq!(snapshot.server_hosts("server1"), vec![HOST_A.to_string()]);
        assert_eq!(snapshot.container_infos("test"), vec![test.clone()]);

        snapshot.unregister_deployment(&test, "server1", HOST_A);
        assert!(snapshot.container_hosts("test1.0").is_empty());
        assert!(snapshot.container_hosts("test").is_empty());
        assert!(snapshot.server_hosts("server1").is_empty());
        assert!(snapshot.container_infos("test").is_empty());
    }

    #[test]
    fn test_unavailable_sweep_keeps_keys() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.add_container_host("container1", HOST_A);
        snapshot.add_server_host("server1", HOST_A);
        snapshot.add_container_info(&info("v1", "test", "g:a:v1"));

        assert_eq!(snapshot.remove_unavailable_server(HOST_A), Some(HOST_A.to_string()));

        assert_eq!(snapshot.hosts_per_container.len(), 1);
        assert_eq!(snapshot.hosts_per_server.len(), 1);
        assert!(snapshot.container_hosts("container1").is_empty());
        assert!(snapshot.server_hosts("server1").is_empty());
        assert_eq!(snapshot.distinct_container_infos().len(), 1);
    }

    #[test]
    fn test_unavailable_sweep_matches_request_url_prefix() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.add_container_host("container1", HOST_A);
        snapshot.add_container_host("container1", HOST_B);
        snapshot.add_container_host("container2", HOST_B);
        snapshot.add_server_host("server1", HOST_A);
        snapshot.add_server_host("server2", HOST_B);

        let removed =
            snapshot.remove_unavailable_server("http://localhost:8180/server/containers/instances/1");

        assert_eq!(removed.as_deref(), Some(HOST_B));
        assert_eq!(snapshot.container_hosts("container1"), vec![HOST_A.to_string()]);
        assert!(snapshot.container_hosts("container2").is_empty());
        assert_eq!(snapshot.server_hosts("server1"), vec![HOST_A.to_string()]);
        assert!(snapshot.server_hosts("server2").is_empty());
    }

    #[test]
    fn test_unavailable_sweep_removes_every_duplicate() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.add_container_host("container1", HOST_A);
        snapshot.add_container_host("container1", HOST_A);

        snapshot.remove_unavailable_server(HOST_A);
        assert!(snapshot.container_hosts("container1").is_empty());
    }

    #[test]
    fn test_unavailable_sweep_without_match() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.add_container_host("container1", HOST_A);

        assert_eq!(snapshot.remove_unavailable_server("http://elsewhere:8080"), None);
        assert_eq!(snapshot.container_hosts("container1"), vec![HOST_A.to_string()]);
    }

    #[test]
    fn test_unavailable_sweep_prefers_first_in_scan_order() {
        let mut snapshot = RegistrySnapshot::new();
        // "http://h:8080/server" is a prefix of "http://h:8080/server2".
        snapshot.add_container_host("a", "http://h:8080/server");
        snapshot.add_container_host("b", "http://h:8080/server2");

        let removed = snapshot.remove_unavailable_server("http://h:8080/server2/containers");
        assert_eq!(removed.as_deref(), Some("http://h:8080/server"));
        assert_eq!(snapshot.container_hosts("b"), vec!["http://h:8080/server2".to_string()]);
    }

    #[test]
    fn test_server_hosts_searched_after_containers() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.add_server_host("server1", HOST_A);

        assert_eq!(snapshot.find_host_for(HOST_A), Some(HOST_A));
        snapshot.remove_unavailable_server(HOST_A);
        assert!(snapshot.server_hosts("server1").is_empty());
    }
}
