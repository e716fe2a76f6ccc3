use std::collections::BTreeMap;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A container deployed on a server, as registered with the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRegistration {
    pub container_id: String,
    /// Leave empty to use the artifact id of the release.
    #[serde(default)]
    pub alias: String,
    /// `group:artifact:version`
    pub release_id: String,
    pub server_id: String,
    pub server_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    pub container_id: String,
    pub alias: String,
    pub release_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    pub hosts_per_container: BTreeMap<String, Vec<String>>,
    pub hosts_per_server: BTreeMap<String, Vec<String>>,
    pub container_infos_per_container: BTreeMap<String, Vec<ContainerInfo>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryStatus {
    pub version: String,
    pub containers: usize,
    pub servers: usize,
    pub container_infos: usize,
    pub host_entries: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct UnavailableOutcome {
    removed: Option<String>,
}

/// Client for the router's management API.
pub struct RouterClient {
    client: Client,
    base_url: String,
}

impl RouterClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn status(&self) -> Result<RegistryStatus, Box<dyn std::error::Error>> {
        self.get("/mgmt/status").await
    }

    pub async fn list(&self) -> Result<Registry, Box<dyn std::error::Error>> {
        self.get("/mgmt/list").await
    }

    pub async fn add(&self, registration: &ContainerRegistration) -> Result<RegistryStatus, Box<dyn std::error::Error>> {
        self.post("/mgmt/add", registration).await
    }

    pub async fn remove(&self, registration: &ContainerRegistration) -> Result<RegistryStatus, Box<dyn std::error::Error>> {
        self.post("/mgmt/remove", registration).await
    }

    /// Report a failed host (or any request URL under it). Returns the host
    /// the router removed, if it knew one.
    pub async fn report_unavailable(&self, url: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
        let outcome: UnavailableOutcome = self
            .post("/mgmt/unavailable", &serde_json::json!({ "url": url }))
            .await?;
        Ok(outcome.removed)
    }

    pub async fn container_hosts(&self, container_id: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        self.get(&format!("/mgmt/containers/{}/hosts", container_id)).await
    }

    pub async fn server_hosts(&self, server_id: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        self.get(&format!("/mgmt/servers/{}/hosts", server_id)).await
    }

    pub async fn alias_containers(&self, alias: &str) -> Result<Vec<ContainerInfo>, Box<dyn std::error::Error>> {
        self.get(&format!("/mgmt/aliases/{}/containers", alias)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        decode(resp).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, Box<dyn std::error::Error>> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(format!("Router returned error status {}: {}", status, text).into());
    }

    Ok(serde_json::from_str(&text)?)
}
