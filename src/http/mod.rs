//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request tracing)
//!     → admin (management handlers)
//!     → registry / repository
//! ```
//!
//! Request forwarding to backends belongs to the router front-end; it uses
//! the host queries and the unavailability hook exposed here.

pub mod server;

pub use server::{AppState, RouterServer};
