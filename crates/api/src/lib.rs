//! # Tablecat API
//!
//! The HTTP surface of the service: router assembly, authentication
//! middleware, error-to-response mapping, and logging setup. The binary in
//! `main.rs` wires configuration and state into [`routes::router`].

pub mod auth;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use state::{build_state, AppState};
