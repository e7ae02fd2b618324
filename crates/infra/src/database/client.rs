//! Catalog client: engine selection and the outer retry boundary.

use std::time::Duration;

use async_trait::async_trait;
use tablecat_common::{ErrorClassification, Retrier, RetryPolicy};
use tablecat_core::TableCatalog;
use tablecat_domain::{DatabaseConfig, Engine, Table, TablecatError};
use tokio::sync::Mutex;
use tracing::debug;

use super::connection::DatabaseConnection;
use super::error::{DbError, DbResult};
use super::mysql::MySqlConnection;
use super::postgres::PgConnection;
use super::queries::query_list_tables;
use super::value::{SqlRow, SqlValue};
use super::ConnectionArgs;

/// Outer retry boundary around whole client calls: the entire query —
/// including any reconnects exhausted inside the connection wrapper — is
/// retried on retryable errors.
fn client_retry_policy() -> RetryPolicy {
    RetryPolicy::exponential(4, Duration::from_secs(1), Duration::from_secs(4), 2.0)
}

/// Engine-agnostic database client owning one connection.
///
/// Not designed for concurrent callers: the single session is serialized
/// behind an async mutex, one client per logical session.
pub struct DbClient {
    engine: Engine,
    dry_run: bool,
    retrier: Retrier,
    connection: Mutex<Box<dyn DatabaseConnection>>,
}

impl DbClient {
    /// Build a client for the configured engine.
    ///
    /// A dry-run configuration may omit the engine section; the
    /// connection is never opened in that mode.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, TablecatError> {
        let args = match config.selected() {
            Some(engine_config) => ConnectionArgs::from(engine_config),
            None if config.dry_run => ConnectionArgs {
                hostname: "localhost".to_string(),
                port: 0,
                login: String::new(),
                password: String::new(),
                database: String::new(),
                program: "tablecat".to_string(),
            },
            None => {
                return Err(TablecatError::Config(format!(
                    "missing [database.{}] section",
                    config.engine
                )))
            }
        };

        let connection: Box<dyn DatabaseConnection> = match config.engine {
            Engine::Mysql => Box::new(MySqlConnection::mysql(args)),
            Engine::Postgresql => Box::new(PgConnection::postgresql(args)),
        };

        Ok(Self::new(config.engine, config.dry_run, connection))
    }

    /// Build a client around an existing connection (used by tests to
    /// inject a scripted one).
    pub fn new(engine: Engine, dry_run: bool, connection: Box<dyn DatabaseConnection>) -> Self {
        Self {
            engine,
            dry_run,
            retrier: Retrier::new(client_retry_policy()),
            connection: Mutex::new(connection),
        }
    }

    /// List up to `limit` tables from the engine catalog.
    pub async fn get_list_of_tables(&self, limit: i64) -> DbResult<Vec<Table>> {
        if self.dry_run {
            debug!(limit, "dry run: serving synthetic catalog rows");
            return Ok((0..limit).map(|i| Table::new(i, format!("table{i}"))).collect());
        }

        let engine = self.engine;
        let mut connection = self.connection.lock().await;

        self.retrier
            .run(
                &mut *connection,
                |error: &DbError| error.is_retryable(),
                move |conn: &mut Box<dyn DatabaseConnection>| {
                    Box::pin(async move {
                        let (sql, params) = query_list_tables(engine, limit);
                        let rows = conn.select(sql, &params, false).await?;
                        Ok(rows.into_iter().map(row_to_table).collect())
                    })
                },
            )
            .await
    }

    /// Release the database session.
    pub async fn disconnect(&self) {
        self.connection.lock().await.disconnect().await;
    }
}

#[async_trait]
impl TableCatalog for DbClient {
    async fn list_tables(&self, limit: i64) -> tablecat_domain::Result<Vec<Table>> {
        self.get_list_of_tables(limit)
            .await
            .map_err(|error| TablecatError::Database(error.to_string()))
    }

    async fn disconnect(&self) {
        DbClient::disconnect(self).await;
    }
}

fn row_to_table(row: SqlRow) -> Table {
    let mut values = row.into_iter();
    let id = values.next().and_then(|value| value.as_i64());
    let name = values.next().and_then(SqlValue::into_text);
    Table { id, name }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex as StdMutex};

    use uuid::Uuid;

    use super::super::error::classify_mysql_code;
    use super::super::value::ExecOutcome;
    use super::*;

    #[derive(Default)]
    struct ScriptState {
        calls: Vec<(String, Vec<SqlValue>)>,
        results: VecDeque<DbResult<Vec<SqlRow>>>,
    }

    struct ScriptedConnection(Arc<StdMutex<ScriptState>>);

    #[async_trait]
    impl DatabaseConnection for ScriptedConnection {
        async fn connect(&mut self) -> DbResult<()> {
            Ok(())
        }

        async fn disconnect(&mut self) {}

        async fn is_alive(&mut self) -> bool {
            true
        }

        async fn select(
            &mut self,
            sql: &str,
            params: &[SqlValue],
            _auto_close: bool,
        ) -> DbResult<Vec<SqlRow>> {
            let mut state = self.0.lock().unwrap();
            state.calls.push((sql.to_string(), params.to_vec()));
            state.results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn execute(
            &mut self,
            _sql: &str,
            _params: &[SqlValue],
            _auto_close: bool,
            _commit: bool,
        ) -> DbResult<ExecOutcome> {
            Ok(ExecOutcome::default())
        }

        async fn commit(&mut self) -> DbResult<()> {
            Ok(())
        }

        async fn rollback(&mut self) -> DbResult<()> {
            Ok(())
        }

        fn session_id(&self) -> Uuid {
            Uuid::nil()
        }
    }

    fn scripted_client(engine: Engine) -> (DbClient, Arc<StdMutex<ScriptState>>) {
        let state = Arc::new(StdMutex::new(ScriptState::default()));
        let connection = ScriptedConnection(Arc::clone(&state));
        (DbClient::new(engine, false, Box::new(connection)), state)
    }

    fn catalog_rows(count: i64) -> Vec<SqlRow> {
        (1..=count)
            .map(|i| vec![SqlValue::Int(i), SqlValue::Text(format!("relation{i}"))])
            .collect()
    }

    #[tokio::test]
    async fn lists_tables_in_catalog_order_with_one_bound_parameter() {
        let (client, state) = scripted_client(Engine::Postgresql);
        state.lock().unwrap().results.push_back(Ok(catalog_rows(5)));

        let tables = client.get_list_of_tables(5).await.unwrap();

        assert_eq!(tables.len(), 5);
        assert_eq!(tables[0], Table::new(1, "relation1"));
        assert_eq!(tables[4], Table::new(5, "relation5"));

        let calls = state.lock().unwrap().calls.clone();
        assert_eq!(calls.len(), 1);
        let (sql, params) = &calls[0];
        assert!(sql.contains("pg_class"));
        assert_eq!(params, &vec![SqlValue::Int(5)], "a single bound parameter equal to 5");
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_errors_are_retried_with_backoff() {
        let (client, state) = scripted_client(Engine::Postgresql);
        {
            let mut locked = state.lock().unwrap();
            locked.results.push_back(Err(classify_mysql_code(2006, "gone away")));
            locked.results.push_back(Err(classify_mysql_code(2013, "lost connection")));
            locked.results.push_back(Ok(catalog_rows(1)));
        }

        let tables = client.get_list_of_tables(1).await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(state.lock().unwrap().calls.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_budget_is_four_whole_call_attempts() {
        let (client, state) = scripted_client(Engine::Postgresql);
        {
            let mut locked = state.lock().unwrap();
            for _ in 0..8 {
                locked.results.push_back(Err(classify_mysql_code(2006, "gone away")));
            }
        }
        let started = tokio::time::Instant::now();

        let result = client.get_list_of_tables(1).await;
        assert!(result.is_err());
        assert_eq!(state.lock().unwrap().calls.len(), 4);
        assert_eq!(
            started.elapsed(),
            Duration::from_secs(1 + 2 + 4),
            "1s, 2s, then capped 4s between the four attempts"
        );
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let (client, state) = scripted_client(Engine::Postgresql);
        state.lock().unwrap().results.push_back(Err(classify_mysql_code(1062, "duplicate")));

        let error = client.get_list_of_tables(1).await.unwrap_err();
        assert!(error.is_permanent_error());
        assert_eq!(state.lock().unwrap().calls.len(), 1);
    }

    #[tokio::test]
    async fn dry_run_serves_synthetic_rows_without_touching_the_connection() {
        let state = Arc::new(StdMutex::new(ScriptState::default()));
        let connection = ScriptedConnection(Arc::clone(&state));
        let client = DbClient::new(Engine::Mysql, true, Box::new(connection));

        let tables = client.get_list_of_tables(3).await.unwrap();
        assert_eq!(
            tables,
            vec![Table::new(0, "table0"), Table::new(1, "table1"), Table::new(2, "table2")]
        );
        assert!(state.lock().unwrap().calls.is_empty());
    }

    #[tokio::test]
    async fn missing_rows_map_to_empty_fields() {
        let (client, state) = scripted_client(Engine::Postgresql);
        state.lock().unwrap().results.push_back(Ok(vec![vec![SqlValue::Null]]));

        let tables = client.get_list_of_tables(1).await.unwrap();
        assert_eq!(tables, vec![Table { id: None, name: None }]);
    }
}
