//! Database error taxonomy.
//!
//! One tagged error type instead of an exception hierarchy: callers match
//! on [`DbErrorKind`] and the retry layers consult
//! [`ErrorClassification`]. Engine backends translate native driver
//! failures into this type; the classification tables below decide which
//! native codes are safe to retry after a reconnect.

use std::fmt;

use tablecat_common::ErrorClassification;

/// Result type for the database layer.
pub type DbResult<T> = Result<T, DbError>;

/// What a failure means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// A live session could not be established or verified.
    Connection,
    /// A classified transient failure; safe to retry after reconnecting.
    Retryable,
    /// A classified non-transient failure, or an unrecognized driver
    /// error; retrying cannot fix it.
    Permanent,
    /// Not a recognized driver error at all.
    Unexpected,
}

/// Native error code carried by a classified failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    /// MySQL numeric error code (client or server range).
    Mysql(u16),
    /// PostgreSQL SQLSTATE.
    Sqlstate(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Mysql(code) => write!(f, "{code}"),
            ErrorCode::Sqlstate(state) => write!(f, "{state}"),
        }
    }
}

/// A failure in the database layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DbError {
    kind: DbErrorKind,
    code: Option<ErrorCode>,
    label: Option<&'static str>,
    message: String,
}

impl DbError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self { kind: DbErrorKind::Connection, code: None, label: None, message: message.into() }
    }

    pub fn retryable(
        code: Option<ErrorCode>,
        label: Option<&'static str>,
        message: impl Into<String>,
    ) -> Self {
        Self { kind: DbErrorKind::Retryable, code, label, message: message.into() }
    }

    pub fn permanent(
        code: Option<ErrorCode>,
        label: Option<&'static str>,
        message: impl Into<String>,
    ) -> Self {
        Self { kind: DbErrorKind::Permanent, code, label, message: message.into() }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self { kind: DbErrorKind::Unexpected, code: None, label: None, message: message.into() }
    }

    pub fn kind(&self) -> DbErrorKind {
        self.kind
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        self.code.as_ref()
    }

    pub fn label(&self) -> Option<&'static str> {
        self.label
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_permanent_error(&self) -> bool {
        self.kind == DbErrorKind::Permanent
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DbErrorKind::Connection => write!(f, "connection error: {}", self.message)?,
            DbErrorKind::Retryable => write!(f, "retryable database error: {}", self.message)?,
            DbErrorKind::Permanent => write!(f, "database error: {}", self.message)?,
            DbErrorKind::Unexpected => write!(f, "unexpected error: {}", self.message)?,
        }
        if let Some(code) = &self.code {
            write!(f, " (code: {code})")?;
        }
        if let Some(label) = self.label {
            write!(f, " [{label}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for DbError {}

impl ErrorClassification for DbError {
    fn is_retryable(&self) -> bool {
        self.kind == DbErrorKind::Retryable
    }
}

/* -------------------------------------------------------------------------- */
/* MySQL classification */
/* -------------------------------------------------------------------------- */

/// Codes safe to retry after a reconnect:
/// 2013 lost connection during query, 2006 server has gone away,
/// 2003 connection refused, 1205 lock wait timeout.
pub const MYSQL_RECOVERABLE_ERRORS: [u16; 4] = [2013, 2006, 2003, 1205];

pub(crate) const ERROR_CANNOT_EXECUTE_MYSQL_COMMAND: &str = "cannot execute mysql command";
pub(crate) const ERROR_CANNOT_EXECUTE_POSTGRESQL_COMMAND: &str =
    "cannot execute postgresql command";

fn mysql_error_label(code: u16) -> Option<&'static str> {
    match code {
        1062 => Some("Duplicate entry"),
        1142 => Some("Command denied to user"),
        1146 => Some("Table doesn't exist"),
        1205 => Some("Lock wait timeout exceeded"),
        2003 => Some("Can't connect to MySQL server"),
        2006 => Some("MySQL server has gone away"),
        2013 => Some("Lost connection to MySQL server during query"),
        _ => None,
    }
}

/// Classify a MySQL server error code. Unrecognized codes are permanent.
pub(crate) fn classify_mysql_code(code: u16, message: impl Into<String>) -> DbError {
    let label = mysql_error_label(code);
    if MYSQL_RECOVERABLE_ERRORS.contains(&code) {
        DbError::retryable(Some(ErrorCode::Mysql(code)), label, message)
    } else {
        DbError::permanent(Some(ErrorCode::Mysql(code)), label, message)
    }
}

/* -------------------------------------------------------------------------- */
/* PostgreSQL classification */
/* -------------------------------------------------------------------------- */

/// SQLSTATEs safe to retry after a reconnect, beyond the whole class 08
/// (connection exceptions): serialization/deadlock/lock-wait conditions and
/// server shutdown states.
pub const PG_RECOVERABLE_STATES: [&str; 6] = ["40001", "40P01", "55P03", "57P01", "57P02", "57P03"];

fn pg_state_label(state: &str) -> Option<&'static str> {
    match state {
        "23505" => Some("Duplicate key value"),
        "40001" => Some("Serialization failure"),
        "40P01" => Some("Deadlock detected"),
        "42501" => Some("Permission denied"),
        "42P01" => Some("Relation does not exist"),
        "55P03" => Some("Lock not available"),
        "57P01" => Some("Server is shutting down"),
        "57P03" => Some("Server cannot accept connections"),
        _ if state.starts_with("08") => Some("Connection exception"),
        _ => None,
    }
}

/// Classify a PostgreSQL SQLSTATE. Unrecognized states are permanent.
pub(crate) fn classify_pg_state(state: &str, message: impl Into<String>) -> DbError {
    let label = pg_state_label(state);
    let code = ErrorCode::Sqlstate(state.to_string());
    if state.starts_with("08") || PG_RECOVERABLE_STATES.contains(&state) {
        DbError::retryable(Some(code), label, message)
    } else {
        DbError::permanent(Some(code), label, message)
    }
}
