//! Management API.
//!
//! # Endpoints
//! ```text
//! GET  /mgmt/status                        version and registry sizes
//! GET  /mgmt/list                          full registry snapshot
//! POST /mgmt/add                           register container on a server
//! POST /mgmt/remove                        deregister container from a server
//! POST /mgmt/unavailable                   purge a failed host everywhere
//! GET  /mgmt/containers/{id}/hosts         hosts for a container id or alias
//! GET  /mgmt/servers/{id}/hosts            hosts for a server id
//! GET  /mgmt/aliases/{alias}/containers    container infos for an alias
//! ```
//!
//! Mutations are persisted through the repository before responding.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/mgmt/status", get(get_status))
        .route("/mgmt/list", get(list))
        .route("/mgmt/add", post(add))
        .route("/mgmt/remove", post(remove))
        .route("/mgmt/unavailable", post(report_unavailable))
        .route("/mgmt/containers/{id}/hosts", get(container_hosts))
        .route("/mgmt/servers/{id}/hosts", get(server_hosts))
        .route("/mgmt/aliases/{alias}/containers", get(alias_containers))
        .with_state(state)
}
