//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry / repository / admin
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (registry gauges, reload and sweep counters)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (container_id, url, path) instead of formatted messages
//! - Metrics are cheap and always recorded; exposition is opt-in

pub mod logging;
pub mod metrics;
