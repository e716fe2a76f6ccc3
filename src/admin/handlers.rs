use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::server::AppState;
use crate::registry::{ContainerInfo, RegistrySnapshot, ReleaseId};
use crate::repository::RepositoryError;

/// Body of `/mgmt/add` and `/mgmt/remove`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRegistration {
    pub container_id: String,
    /// Defaults to the artifact id of `release_id` when blank or absent.
    #[serde(default)]
    pub alias: String,
    pub release_id: String,
    pub server_id: String,
    pub server_url: String,
}

impl ContainerRegistration {
    fn container_info(&self) -> Result<ContainerInfo, ApiError> {
        for (field, value) in [
            ("containerId", &self.container_id),
            ("releaseId", &self.release_id),
            ("serverId", &self.server_id),
            ("serverUrl", &self.server_url),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::BadRequest(format!("{} is required", field)));
            }
        }

        let release: ReleaseId = self
            .release_id
            .parse()
            .map_err(|e| ApiError::BadRequest(format!("{}", e)))?;

        Ok(if self.alias.trim().is_empty() {
            ContainerInfo::from_release(self.container_id.as_str(), release)
        } else {
            ContainerInfo::new(self.container_id.as_str(), self.alias.as_str(), release)
        })
    }
}

/// Body of `/mgmt/unavailable`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailableReport {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct UnavailableOutcome {
    pub removed: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegistryStatus {
    pub version: &'static str,
    pub containers: usize,
    pub servers: usize,
    pub container_infos: usize,
    pub host_entries: usize,
}

impl RegistryStatus {
    fn of(snapshot: &RegistrySnapshot) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            containers: snapshot.hosts_per_container.len(),
            servers: snapshot.hosts_per_server.len(),
            container_infos: snapshot.distinct_container_infos().len(),
            host_entries: snapshot.host_entry_count(),
        }
    }
}

/// Errors returned by management handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Failed to persist registry: {0}")]
    Persistence(#[from] RepositoryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Persistence(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Management request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<RegistryStatus> {
    Json(RegistryStatus::of(&state.configuration.snapshot()))
}

pub async fn list(State(state): State<AppState>) -> Json<RegistrySnapshot> {
    Json(RegistrySnapshot::clone(&state.configuration.snapshot()))
}

pub async fn add(
    State(state): State<AppState>,
    Json(registration): Json<ContainerRegistration>,
) -> Result<Json<RegistryStatus>, ApiError> {
    let info = registration.container_info()?;
    state
        .configuration
        .register_deployment(&info, &registration.server_id, &registration.server_url);
    persist(&state).await?;
    Ok(Json(RegistryStatus::of(&state.configuration.snapshot())))
}

pub async fn remove(
    State(state): State<AppState>,
    Json(registration): Json<ContainerRegistration>,
) -> Result<Json<RegistryStatus>, ApiError> {
    let info = registration.container_info()?;
    state
        .configuration
        .unregister_deployment(&info, &registration.server_id, &registration.server_url);
    persist(&state).await?;
    Ok(Json(RegistryStatus::of(&state.configuration.snapshot())))
}

pub async fn report_unavailable(
    State(state): State<AppState>,
    Json(report): Json<UnavailableReport>,
) -> Result<Json<UnavailableOutcome>, ApiError> {
    if report.url.trim().is_empty() {
        return Err(ApiError::BadRequest("url is required".to_string()));
    }

    let removed = state.configuration.remove_unavailable_server(&report.url);
    if removed.is_some() {
        persist(&state).await?;
    }
    Ok(Json(UnavailableOutcome { removed }))
}

pub async fn container_hosts(
    State(state): State<AppState>,
    Path(container_id): Path<String>,
) -> Json<Vec<String>> {
    Json(state.configuration.container_hosts(&container_id))
}

pub async fn server_hosts(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
) -> Json<Vec<String>> {
    Json(state.configuration.server_hosts(&server_id))
}

pub async fn alias_containers(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> Json<Vec<ContainerInfo>> {
    Json(state.configuration.container_infos(&alias))
}

/// Write the live registry through the repository off the async workers.
async fn persist(state: &AppState) -> Result<(), ApiError> {
    let configuration = state.configuration.clone();
    let repository = state.repository.clone();
    tokio::task::spawn_blocking(move || repository.persist(&configuration))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(())
}
