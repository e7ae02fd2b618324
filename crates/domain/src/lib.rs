//! # Tablecat Domain
//!
//! Types shared across the workspace: API request/response models, the
//! configuration tree, and the application error type. No behavior beyond
//! construction and (de)serialization lives here.

pub mod config;
pub mod errors;
pub mod types;

pub use config::{
    AuthConfig, BasicAuthConfig, Config, DatabaseConfig, Engine, EngineConfig, LogConfig,
    LogFormat, ServerConfig, SsoConfig,
};
pub use errors::{Result, TablecatError};
pub use types::{
    AuthContext, AuthMethod, ErrorResponse, GetDateResponse, HealthCheck, ListTablesResponse,
    Table,
};
