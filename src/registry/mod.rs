//! Container/server host registry.
//!
//! # Data Flow
//! ```text
//! Admin API (add/remove)        Proxy layer (connection failure)
//!     → configuration.rs            → remove_unavailable_server(url)
//!     → writer lock, clone snapshot, mutate (snapshot.rs), publish
//!
//! Repository reload (explicit or file watcher):
//!     parsed RegistrySnapshot
//!     → reload_from_snapshot (single publish of all three maps)
//!     → listener.rs callbacks, outside the writer lock
//!
//! Readers:
//!     snapshot() / container_hosts() → lock-free load of the current Arc
//! ```
//!
//! # Design Decisions
//! - Unknown ids read as empty, never as errors
//! - Host lists keep insertion order and allow duplicates
//! - Emptied host lists keep their key; both states read as empty

pub mod configuration;
pub mod container_info;
pub mod listener;
pub mod snapshot;

pub use configuration::Configuration;
pub use container_info::{ContainerInfo, ReleaseId, ReleaseIdError};
pub use listener::{ConfigurationListener, ListenerId};
pub use snapshot::{ContainerInfoMap, HostMap, RegistrySnapshot};
