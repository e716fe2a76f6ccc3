//! Metrics collection and exposition.
//!
//! # Metrics
//! - `kie_router_containers` (gauge): container ids known to the registry
//! - `kie_router_servers` (gauge): server ids known to the registry
//! - `kie_router_host_entries` (gauge): container + server host entries
//! - `kie_router_reloads_total` (counter): whole-registry reloads
//! - `kie_router_unavailable_sweeps_total` (counter): sweeps, by outcome
//! - `kie_router_watch_errors_total` (counter): failed file-watch reloads
//! - `kie_router_persist_total` (counter): repository writes, by outcome
//!
//! Recording is a no-op until a recorder is installed by [`init_metrics`].

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::registry::RegistrySnapshot;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_registry_size(snapshot: &RegistrySnapshot) {
    metrics::gauge!("kie_router_containers").set(snapshot.hosts_per_container.len() as f64);
    metrics::gauge!("kie_router_servers").set(snapshot.hosts_per_server.len() as f64);
    metrics::gauge!("kie_router_host_entries").set(snapshot.host_entry_count() as f64);
}

pub fn record_reload() {
    metrics::counter!("kie_router_reloads_total").increment(1);
}

pub fn record_unavailable_sweep(matched: bool) {
    let outcome = if matched { "removed" } else { "no_match" };
    metrics::counter!("kie_router_unavailable_sweeps_total", "outcome" => outcome).increment(1);
}

pub fn record_watch_error() {
    metrics::counter!("kie_router_watch_errors_total").increment(1);
}

pub fn record_persist(success: bool) {
    let outcome = if success { "ok" } else { "error" };
    metrics::counter!("kie_router_persist_total", "outcome" => outcome).increment(1);
}
