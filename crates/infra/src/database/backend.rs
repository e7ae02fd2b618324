//! Engine SPI.
//!
//! One implementation per database driver. A backend owns at most one live
//! transport handle and translates native rows and errors into the uniform
//! types; everything session-shaped (lifecycle, probing, reconnect policy)
//! lives in [`Connection`](super::connection::Connection).

use async_trait::async_trait;

use super::args::ConnectionArgs;
use super::error::DbResult;
use super::value::{ExecOutcome, SqlRow, SqlValue};

#[async_trait]
pub trait SqlBackend: Send {
    /// Engine name for logs and error messages.
    fn engine(&self) -> &'static str;

    /// Whether a transport handle is currently held. Says nothing about
    /// whether the transport still works.
    fn is_open(&self) -> bool;

    /// Open a fresh transport handle. Replaces any existing one.
    async fn open(&mut self, args: &ConnectionArgs) -> DbResult<()>;

    /// Close the handle, swallowing transport-teardown errors (the remote
    /// peer may already have closed its end). Always clears the handle.
    async fn close(&mut self);

    /// Run a read query and return all rows.
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>>;

    /// Run a mutating statement.
    async fn exec(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<ExecOutcome>;

    async fn commit(&mut self) -> DbResult<()>;

    async fn rollback(&mut self) -> DbResult<()>;
}
