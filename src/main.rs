//! KIE Server Router registry service.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                 KIE SERVER ROUTER                 │
//!                 │                                                   │
//!  admin / proxy  │  ┌──────────┐    ┌──────────┐    ┌─────────────┐  │
//!  ───────────────┼─▶│  http    │───▶│  admin   │───▶│  registry   │  │
//!                 │  │  server  │    │ handlers │    │Configuration│  │
//!                 │  └──────────┘    └────┬─────┘    └──────▲──────┘  │
//!                 │                       │ persist         │ reload  │
//!                 │                       ▼                 │         │
//!                 │                 ┌──────────────┐  ┌─────┴──────┐  │
//!                 │                 │  repository  │  │  watcher   │  │
//!                 │                 │ (JSON file)  │◀─│  thread    │  │
//!                 │                 └──────────────┘  └────────────┘  │
//!                 │                                                   │
//!                 │  config · observability · lifecycle              │
//!                 └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use kie_server_router::config::loader::load_effective;
use kie_server_router::http::{AppState, RouterServer};
use kie_server_router::lifecycle::{signals, startup, Shutdown};
use kie_server_router::observability::{logging, metrics};
use kie_server_router::repository::ConfigurationRepository;

#[derive(Parser)]
#[command(name = "kie-server-router")]
#[command(about = "Container/server registry for the KIE Server Router", long_about = None)]
struct Args {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_effective(args.config.as_deref())?;
    logging::init_logging(&config.observability.log_level)?;

    tracing::info!("kie-server-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        repository_dir = %config.repository.dir.display(),
        watcher_enabled = config.repository.watcher_enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(error = %e, "Failed to parse metrics address"),
        }
    }

    let (repository, configuration) = startup::open_registry(&config.repository)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();
    let server = RouterServer::new(AppState::new(configuration, repository.clone()));
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::wait_for_signal().await;
    shutdown.trigger();

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Management API failed"),
        Err(e) => tracing::error!(error = %e, "Management API task panicked"),
    }

    repository.close();
    tracing::info!("Shutdown complete");
    Ok(())
}
