//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router for the management API
//! - Wire up request tracing
//! - Bind server to listener and stop on the shutdown signal

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::admin::setup_admin_router;
use crate::registry::Configuration;
use crate::repository::ConfigurationRepository;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub configuration: Arc<Configuration>,
    pub repository: Arc<dyn ConfigurationRepository>,
}

impl AppState {
    pub fn new(configuration: Arc<Configuration>, repository: Arc<dyn ConfigurationRepository>) -> Self {
        Self {
            configuration,
            repository,
        }
    }
}

/// HTTP server exposing the registry to the router front-end and operators.
pub struct RouterServer {
    router: Router,
}

impl RouterServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    fn build_router(state: AppState) -> Router {
        setup_admin_router(state)
            .route("/health", get(|| async { "OK" }))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Management API listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Management API shutting down");
            })
            .await?;

        tracing::info!("Management API stopped");
        Ok(())
    }
}
