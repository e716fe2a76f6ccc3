//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! router.toml (optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: ROUTER_REPOSITORY_DIR,
//!                  CONFIG_FILE_WATCHER_ENABLED, ...)
//!     → validation.rs (semantic checks)
//!     → RouterConfig handed to main for wiring
//! ```
//!
//! These are the router's own settings. The registry contents live in the
//! repository file and are reloaded by `repository::watcher`, not here.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{ListenerConfig, ObservabilityConfig, RepositoryConfig, RouterConfig};
pub use validation::ValidationError;
