//! Client for the KIE Server Router management API.

pub mod client;

pub use client::{ContainerInfo, ContainerRegistration, Registry, RegistryStatus, RouterClient};
