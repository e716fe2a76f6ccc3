//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use kie_server_router::config::RepositoryConfig;
use kie_server_router::http::{AppState, RouterServer};
use kie_server_router::lifecycle::Shutdown;
use kie_server_router::registry::{Configuration, ConfigurationListener, RegistrySnapshot};
use kie_server_router::repository::FileRepository;
use tokio::net::TcpListener;

/// Repository settings tuned for fast tests.
#[allow(dead_code)]
pub fn watched_repository(dir: &Path) -> RepositoryConfig {
    RepositoryConfig {
        watcher_enabled: true,
        watcher_interval_ms: 100,
        watcher_debounce_ms: 50,
        ..RepositoryConfig::in_dir(dir)
    }
}

/// Listener counting reload notifications.
#[allow(dead_code)]
pub fn reload_counter(configuration: &Configuration) -> Arc<AtomicUsize> {
    let counter = Arc::new(AtomicUsize::new(0));
    let c = counter.clone();
    let listener: Arc<dyn ConfigurationListener> = Arc::new(move |_: &RegistrySnapshot| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    configuration.add_listener(listener);
    counter
}

/// Poll `check` until it holds or `deadline` passes.
#[allow(dead_code)]
pub fn wait_until(deadline: Duration, check: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    check()
}

/// Start the management API on an ephemeral port.
#[allow(dead_code)]
pub async fn start_router(dir: &Path) -> (SocketAddr, Arc<Configuration>, Shutdown) {
    let repository = Arc::new(FileRepository::new(RepositoryConfig::in_dir(dir)));
    let configuration = Arc::new(Configuration::new());
    let server = RouterServer::new(AppState::new(configuration.clone(), repository));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, configuration, shutdown)
}
