//! On-disk representation of a registry snapshot.
//!
//! ```json
//! {
//!   "containers": [ { "id": "container1", "hosts": ["http://a:8080/server"] } ],
//!   "servers":    [ { "id": "server1", "hosts": ["http://a:8080/server"] } ],
//!   "containerInfo": [ { "containerId": "test1.0", "alias": "test",
//!                        "groupId": "org.kie", "artifactId": "test", "version": "1.0" } ]
//! }
//! ```
//!
//! Host lists are stored grouped by id so order and emptied entries survive a
//! round trip. Container infos are stored once each and re-registered under
//! their keys on load.

use serde::{Deserialize, Serialize};

use crate::registry::{ContainerInfo, HostMap, RegistrySnapshot, ReleaseId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    #[serde(default)]
    pub containers: Vec<HostEntry>,

    #[serde(default)]
    pub servers: Vec<HostEntry>,

    #[serde(default)]
    pub container_info: Vec<ContainerInfoRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    pub id: String,
    #[serde(default)]
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfoRow {
    pub container_id: String,
    pub alias: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

/// A record that parsed as JSON but cannot describe a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRecord(pub String);

impl RepositoryRecord {
    pub fn from_snapshot(snapshot: &RegistrySnapshot) -> Self {
        Self {
            containers: host_entries(&snapshot.hosts_per_container),
            servers: host_entries(&snapshot.hosts_per_server),
            container_info: snapshot
                .distinct_container_infos()
                .into_iter()
                .map(ContainerInfoRow::from)
                .collect(),
        }
    }

    /// Rebuild the snapshot. Rejects blank ids and duplicate entries rather
    /// than guessing which one wins.
    pub fn into_snapshot(self) -> Result<RegistrySnapshot, InvalidRecord> {
        let mut snapshot = RegistrySnapshot::new();
        fill_hosts(&mut snapshot.hosts_per_container, self.containers, "container")?;
        fill_hosts(&mut snapshot.hosts_per_server, self.servers, "server")?;

        for row in self.container_info {
            let info = row.into_info()?;
            snapshot.add_container_info(&info);
        }

        Ok(snapshot)
    }
}

impl From<ContainerInfo> for ContainerInfoRow {
    fn from(info: ContainerInfo) -> Self {
        Self {
            container_id: info.container_id,
            alias: info.alias,
            group_id: info.release_id.group_id,
            artifact_id: info.release_id.artifact_id,
            version: info.release_id.version,
        }
    }
}

impl ContainerInfoRow {
    fn into_info(self) -> Result<ContainerInfo, InvalidRecord> {
        if self.container_id.trim().is_empty() || self.alias.trim().is_empty() {
            return Err(InvalidRecord(format!(
                "container info for release {}:{}:{} has a blank id or alias",
                self.group_id, self.artifact_id, self.version
            )));
        }
        let release: ReleaseId = format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
            .parse()
            .map_err(|e| InvalidRecord(format!("container info '{}': {}", self.container_id, e)))?;
        Ok(ContainerInfo::new(self.container_id, self.alias, release))
    }
}

fn host_entries(map: &HostMap) -> Vec<HostEntry> {
    map.iter()
        .map(|(id, hosts)| HostEntry {
            id: id.clone(),
            hosts: hosts.clone(),
        })
        .collect()
}

fn fill_hosts(map: &mut HostMap, entries: Vec<HostEntry>, kind: &str) -> Result<(), InvalidRecord> {
    for entry in entries {
        if entry.id.trim().is_empty() {
            return Err(InvalidRecord(format!("{} entry with a blank id", kind)));
        }
        if map.contains_key(&entry.id) {
            return Err(InvalidRecord(format!("duplicate {} entry '{}'", kind, entry.id)));
        }
        map.insert(entry.id, entry.hosts);
    }
    Ok(())
}
