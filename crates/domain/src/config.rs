//! Application configuration tree.
//!
//! Deserialized from a TOML or JSON file by the infra loader. The sections
//! mirror what the service actually consumes: HTTP bind address, auth
//! toggles, database engines, log output.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8000 }
    }
}

/// Authentication toggles. Both schemes disabled means every request is
/// treated as anonymous (local development mode).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub basic: BasicAuthConfig,
    #[serde(default)]
    pub sso: SsoConfig,
}

impl AuthConfig {
    /// Whether any authentication scheme is enforced.
    pub fn enforced(&self) -> bool {
        self.basic.enable || self.sso.enable
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicAuthConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SsoConfig {
    #[serde(default)]
    pub enable: bool,
}

/// Database engine selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Mysql,
    Postgresql,
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::Mysql => write!(f, "mysql"),
            Engine::Postgresql => write!(f, "postgresql"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub engine: Engine,
    /// Skip real queries and serve synthetic rows.
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub mysql: Option<EngineConfig>,
    #[serde(default)]
    pub postgresql: Option<EngineConfig>,
}

impl DatabaseConfig {
    /// The engine section matching the selector, if present.
    pub fn selected(&self) -> Option<&EngineConfig> {
        match self.engine {
            Engine::Mysql => self.mysql.as_ref(),
            Engine::Postgresql => self.postgresql.as_ref(),
        }
    }
}

/// Connection parameters for one database instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    /// Client program name reported to the server.
    #[serde(default = "default_program")]
    pub program: String,
}

fn default_program() -> String {
    "tablecat".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Text }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}
