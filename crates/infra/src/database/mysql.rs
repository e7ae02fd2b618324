//! MySQL engine backend over `mysql_async`.

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder, Params};
use tracing::debug;

use super::args::ConnectionArgs;
use super::backend::SqlBackend;
use super::connection::Connection;
use super::error::{classify_mysql_code, DbError, DbResult, ERROR_CANNOT_EXECUTE_MYSQL_COMMAND};
use super::value::{ExecOutcome, SqlRow, SqlValue};

/// A MySQL session.
pub type MySqlConnection = Connection<MySqlBackend>;

impl MySqlConnection {
    /// Connection wrapper for a MySQL instance.
    pub fn mysql(args: ConnectionArgs) -> Self {
        Connection::new(MySqlBackend::default(), args)
    }
}

/// Owns at most one live `mysql_async` connection.
///
/// All statements go through the prepared-statement (binary) protocol so
/// results come back typed; the probe query in particular yields
/// `Int(1)` rather than a textual `"1"`.
#[derive(Debug, Default)]
pub struct MySqlBackend {
    conn: Option<Conn>,
}

#[async_trait]
impl SqlBackend for MySqlBackend {
    fn engine(&self) -> &'static str {
        "mysql"
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    async fn open(&mut self, args: &ConnectionArgs) -> DbResult<()> {
        // mysql_async has no client-program option; the program name is
        // carried on the session logs instead (see Connection::connect).
        let opts = OptsBuilder::default()
            .ip_or_hostname(args.hostname.clone())
            .tcp_port(args.port)
            .user(Some(args.login.clone()))
            .pass(Some(args.password.clone()))
            .db_name(Some(args.database.clone()));

        let conn = Conn::new(opts).await.map_err(map_connect_error)?;
        self.conn = Some(conn);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            // The server may already have dropped its end; a failed quit
            // command is not interesting.
            if let Err(error) = conn.disconnect().await {
                debug!(%error, "ignoring error during MySQL teardown");
            }
        }
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>> {
        let conn = self.conn.as_mut().ok_or_else(no_open_session)?;
        let rows: Vec<mysql_async::Row> =
            conn.exec(sql, to_params(params)).await.map_err(map_exec_error)?;
        Ok(rows.into_iter().map(from_mysql_row).collect())
    }

    async fn exec(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<ExecOutcome> {
        let conn = self.conn.as_mut().ok_or_else(no_open_session)?;
        conn.exec_drop(sql, to_params(params)).await.map_err(map_exec_error)?;
        Ok(ExecOutcome {
            rows_affected: conn.affected_rows(),
            last_insert_id: conn.last_insert_id(),
        })
    }

    async fn commit(&mut self) -> DbResult<()> {
        let conn = self.conn.as_mut().ok_or_else(no_open_session)?;
        conn.query_drop("COMMIT").await.map_err(map_exec_error)
    }

    async fn rollback(&mut self) -> DbResult<()> {
        let conn = self.conn.as_mut().ok_or_else(no_open_session)?;
        conn.query_drop("ROLLBACK").await.map_err(map_exec_error)
    }
}

fn no_open_session() -> DbError {
    DbError::connection("no open MySQL session")
}

fn to_params(params: &[SqlValue]) -> Params {
    if params.is_empty() {
        return Params::Empty;
    }
    Params::Positional(params.iter().map(to_mysql_value).collect())
}

fn to_mysql_value(value: &SqlValue) -> mysql_async::Value {
    match value {
        SqlValue::Null => mysql_async::Value::NULL,
        SqlValue::Bool(flag) => mysql_async::Value::Int(i64::from(*flag)),
        SqlValue::Int(number) => mysql_async::Value::Int(*number),
        SqlValue::Float(number) => mysql_async::Value::Double(*number),
        SqlValue::Text(text) => mysql_async::Value::Bytes(text.clone().into_bytes()),
    }
}

fn from_mysql_row(row: mysql_async::Row) -> SqlRow {
    row.unwrap().into_iter().map(from_mysql_value).collect()
}

fn from_mysql_value(value: mysql_async::Value) -> SqlValue {
    match value {
        mysql_async::Value::NULL => SqlValue::Null,
        mysql_async::Value::Int(number) => SqlValue::Int(number),
        mysql_async::Value::UInt(number) => match i64::try_from(number) {
            Ok(number) => SqlValue::Int(number),
            Err(_) => SqlValue::Text(number.to_string()),
        },
        mysql_async::Value::Float(number) => SqlValue::Float(f64::from(number)),
        mysql_async::Value::Double(number) => SqlValue::Float(number),
        mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => SqlValue::Text(text),
            Err(error) => {
                SqlValue::Text(String::from_utf8_lossy(error.as_bytes()).into_owned())
            }
        },
        // Temporal values and anything else render as SQL literals.
        other => SqlValue::Text(other.as_sql(true)),
    }
}

/// Failures while opening a session. Server- and transport-level causes
/// are connection errors; anything else is unexpected and handled by the
/// wrapper's setup-cleanup path.
fn map_connect_error(error: mysql_async::Error) -> DbError {
    match &error {
        mysql_async::Error::Server(_)
        | mysql_async::Error::Io(_)
        | mysql_async::Error::Driver(_) => {
            DbError::connection(format!("can't connect to MySQL: {error}"))
        }
        _ => DbError::unexpected(error.to_string()),
    }
}

/// Failures while running a statement. Server errors classify by code;
/// transport failures with no code are recoverable at the helper layer.
fn map_exec_error(error: mysql_async::Error) -> DbError {
    match &error {
        mysql_async::Error::Server(server) => classify_mysql_code(
            server.code,
            format!("{ERROR_CANNOT_EXECUTE_MYSQL_COMMAND}: {}", server.message),
        ),
        mysql_async::Error::Io(_) | mysql_async::Error::Driver(_) => DbError::retryable(
            None,
            Some("connection interface failure"),
            format!("{ERROR_CANNOT_EXECUTE_MYSQL_COMMAND}: {error}"),
        ),
        _ => DbError::unexpected(error.to_string()),
    }
}
