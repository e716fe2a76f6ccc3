//! KIE Server Router registry library.
//!
//! Tracks which backend KIE Server hosts serve which containers and servers,
//! persists that mapping, reloads it when its file changes and purges hosts
//! reported unavailable.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod repository;

pub use config::RouterConfig;
pub use http::RouterServer;
pub use lifecycle::Shutdown;
pub use registry::{Configuration, ConfigurationListener, ContainerInfo, RegistrySnapshot, ReleaseId};
pub use repository::{ConfigurationRepository, FileRepository, RepositoryError};
