//! Dual-engine database layer.
//!
//! Layering, innermost first:
//! - [`backend`]: the engine SPI — one stateful implementation per driver
//!   ([`mysql::MySqlBackend`], [`postgres::PgBackend`]) translating native
//!   rows and errors into the uniform [`value`] / [`error`] types.
//! - [`connection`]: the engine-generic wrapper owning one session —
//!   lifecycle, liveness probe, and the bounded reconnect-and-retry
//!   execution helpers.
//! - [`client`]: the catalog client — engine selection, dry-run mode, and
//!   the outer backoff retry around whole calls.
//!
//! The two retry layers compose: a single client call may reconnect
//! transparently inside the connection wrapper several times, and if it
//! still fails with a retryable error the client retries the entire call
//! from scratch.

pub mod args;
pub mod backend;
pub mod client;
pub mod connection;
pub mod error;
pub mod mysql;
pub mod postgres;
pub mod queries;
pub mod value;

pub use args::ConnectionArgs;
pub use client::DbClient;
pub use connection::{Connection, DatabaseConnection};
pub use error::{DbError, DbErrorKind, DbResult, ErrorCode};
pub use mysql::{MySqlBackend, MySqlConnection};
pub use postgres::{PgBackend, PgConnection};
pub use value::{ExecOutcome, SqlRow, SqlValue};
