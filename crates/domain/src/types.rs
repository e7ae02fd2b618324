//! API models and the authenticated-request context.
//!
//! Field names on the wire keep the original camelCase aliases
//! (`tableId` / `tableName`) so existing consumers keep working.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the table listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    #[serde(rename = "tableId")]
    pub id: Option<i64>,
    #[serde(rename = "tableName")]
    pub name: Option<String>,
}

impl Table {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self { id: Some(id), name: Some(name.into()) }
    }
}

/// Response body of `ListTables`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTablesResponse {
    pub tables: Vec<Table>,
}

/// Response body of `GetDate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDateResponse {
    pub date: DateTime<Utc>,
}

/// Response when performing a health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self { status: "OK".to_string() }
    }
}

/// Error payload returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: u16, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: Some(code), name: Some(name.into()), message: Some(message.into()) }
    }
}

/// How a request was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Basic,
    Bearer,
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Opaque identity id (JWT `identity_id` claim, or the basic login).
    pub user_id: String,
    /// Display name (JWT `email` claim, or the basic login).
    pub display_name: String,
    pub method: AuthMethod,
}
