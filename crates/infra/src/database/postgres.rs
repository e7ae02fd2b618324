//! PostgreSQL engine backend over `tokio-postgres`.

use async_trait::async_trait;
use bytes::BytesMut;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::{Client, NoTls};
use tracing::debug;

use super::args::ConnectionArgs;
use super::backend::SqlBackend;
use super::connection::Connection;
use super::error::{
    classify_pg_state, DbError, DbResult, ERROR_CANNOT_EXECUTE_POSTGRESQL_COMMAND,
};
use super::value::{ExecOutcome, SqlRow, SqlValue};

/// A PostgreSQL session.
pub type PgConnection = Connection<PgBackend>;

impl PgConnection {
    /// Connection wrapper for a PostgreSQL instance.
    pub fn postgresql(args: ConnectionArgs) -> Self {
        Connection::new(PgBackend::default(), args)
    }
}

/// Owns at most one live `tokio-postgres` client.
///
/// The driver's connection future runs on a detached task; it exits when
/// the client is dropped, so teardown errors only ever surface as debug
/// logs there.
#[derive(Debug, Default)]
pub struct PgBackend {
    client: Option<Client>,
}

#[async_trait]
impl SqlBackend for PgBackend {
    fn engine(&self) -> &'static str {
        "postgresql"
    }

    fn is_open(&self) -> bool {
        self.client.is_some()
    }

    async fn open(&mut self, args: &ConnectionArgs) -> DbResult<()> {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&args.hostname)
            .port(args.port)
            .user(&args.login)
            .password(&args.password)
            .dbname(&args.database)
            .application_name(&args.program);

        let (client, connection) = config
            .connect(NoTls)
            .await
            .map_err(|error| DbError::connection(format!("can't connect to PostgreSQL: {error}")))?;

        tokio::spawn(async move {
            if let Err(error) = connection.await {
                debug!(%error, "postgresql connection task ended with error");
            }
        });

        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) {
        // Dropping the client closes the socket; the detached connection
        // task absorbs whatever the server does with its end.
        self.client = None;
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>> {
        let client = self.client.as_ref().ok_or_else(no_open_session)?;
        let wrapped: Vec<PgParam<'_>> = params.iter().map(PgParam).collect();
        let refs: Vec<&(dyn ToSql + Sync)> =
            wrapped.iter().map(|param| param as &(dyn ToSql + Sync)).collect();

        let rows = client.query(sql, &refs).await.map_err(map_exec_error)?;
        rows.iter().map(from_pg_row).collect()
    }

    async fn exec(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<ExecOutcome> {
        let client = self.client.as_ref().ok_or_else(no_open_session)?;
        let wrapped: Vec<PgParam<'_>> = params.iter().map(PgParam).collect();
        let refs: Vec<&(dyn ToSql + Sync)> =
            wrapped.iter().map(|param| param as &(dyn ToSql + Sync)).collect();

        let rows_affected = client.execute(sql, &refs).await.map_err(map_exec_error)?;
        Ok(ExecOutcome { rows_affected, last_insert_id: None })
    }

    async fn commit(&mut self) -> DbResult<()> {
        let client = self.client.as_ref().ok_or_else(no_open_session)?;
        client.batch_execute("COMMIT").await.map_err(map_exec_error)
    }

    async fn rollback(&mut self) -> DbResult<()> {
        let client = self.client.as_ref().ok_or_else(no_open_session)?;
        client.batch_execute("ROLLBACK").await.map_err(map_exec_error)
    }
}

fn no_open_session() -> DbError {
    DbError::connection("no open PostgreSQL session")
}

/// Adapter so the uniform value type can travel as a statement parameter.
#[derive(Debug)]
struct PgParam<'a>(&'a SqlValue);

impl ToSql for PgParam<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.0 {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(value) => value.to_sql(ty, out),
            SqlValue::Int(value) => value.to_sql(ty, out),
            SqlValue::Float(value) => value.to_sql(ty, out),
            SqlValue::Text(value) => value.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn from_pg_row(row: &tokio_postgres::Row) -> DbResult<SqlRow> {
    let mut values = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        values.push(from_pg_column(row, index, column.type_())?);
    }
    Ok(values)
}

fn from_pg_column(row: &tokio_postgres::Row, index: usize, ty: &Type) -> DbResult<SqlValue> {
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(index).map(|v| v.map(SqlValue::Bool))
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(index).map(|v| v.map(|n| SqlValue::Int(i64::from(n))))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(index).map(|v| v.map(|n| SqlValue::Int(i64::from(n))))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(index).map(|v| v.map(SqlValue::Int))
    } else if *ty == Type::OID {
        row.try_get::<_, Option<u32>>(index).map(|v| v.map(|n| SqlValue::Int(i64::from(n))))
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(index).map(|v| v.map(|n| SqlValue::Float(f64::from(n))))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(index).map(|v| v.map(SqlValue::Float))
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::NAME || *ty == Type::BPCHAR
    {
        row.try_get::<_, Option<String>>(index).map(|v| v.map(SqlValue::Text))
    } else {
        return Err(DbError::unexpected(format!("unsupported column type: {ty}")));
    };

    value.map(|v| v.unwrap_or(SqlValue::Null)).map_err(map_exec_error)
}

/// Failures while running a statement. Server reports classify by
/// SQLSTATE; a closed connection is recoverable at the helper layer;
/// anything else is not a database error at all.
fn map_exec_error(error: tokio_postgres::Error) -> DbError {
    if let Some(server) = error.as_db_error() {
        return classify_pg_state(
            server.code().code(),
            format!("{ERROR_CANNOT_EXECUTE_POSTGRESQL_COMMAND}: {}", server.message()),
        );
    }
    if error.is_closed() {
        return DbError::retryable(
            None,
            Some("connection closed"),
            format!("{ERROR_CANNOT_EXECUTE_POSTGRESQL_COMMAND}: {error}"),
        );
    }
    DbError::unexpected(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::super::error::DbErrorKind;
    use super::*;

    #[test]
    fn params_encode_through_the_native_codec() {
        let value = SqlValue::Int(5);
        let param = PgParam(&value);
        let mut out = BytesMut::new();

        let result = param.to_sql(&Type::INT8, &mut out).unwrap();
        assert!(matches!(result, IsNull::No));
        assert_eq!(out.as_ref(), 5i64.to_be_bytes());
    }

    #[test]
    fn null_params_encode_as_null() {
        let value = SqlValue::Null;
        let param = PgParam(&value);
        let mut out = BytesMut::new();

        let result = param.to_sql(&Type::INT8, &mut out).unwrap();
        assert!(matches!(result, IsNull::Yes));
        assert!(out.is_empty());
    }

    #[test]
    fn no_session_errors_are_connection_kind() {
        assert_eq!(no_open_session().kind(), DbErrorKind::Connection);
    }
}
