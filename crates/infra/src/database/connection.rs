//! Engine-generic connection wrapper.
//!
//! [`Connection`] owns a single database session through a
//! [`SqlBackend`] and provides safe query primitives on top of it:
//! explicit lifecycle (`connect` / `disconnect`), a liveness probe, and
//! execution helpers that transparently reconnect and re-issue the
//! operation on recoverable transport failures, bounded by a retry
//! counter.
//!
//! Callers that need to stay engine-agnostic use the
//! [`DatabaseConnection`] trait, which both concrete connection types
//! ([`MySqlConnection`](super::mysql::MySqlConnection),
//! [`PgConnection`](super::postgres::PgConnection)) satisfy.

use async_trait::async_trait;
use tablecat_common::ErrorClassification;
use tracing::{debug, error};
use uuid::Uuid;

use super::args::ConnectionArgs;
use super::backend::SqlBackend;
use super::error::{DbError, DbErrorKind, DbResult};
use super::value::{ExecOutcome, SqlRow, SqlValue};

/// Trivial fixed query used solely to verify a session is usable.
pub(crate) const PROBE_QUERY: &str = "SELECT 1";

/// Reconnect budget of the execution helpers: one initial attempt plus
/// this many reconnect-and-retry rounds.
pub const DEFAULT_RECONNECT_RETRIES: u32 = 3;

/// Uniform connection contract exposed to engine-agnostic callers.
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Open the session if it is not already alive.
    async fn connect(&mut self) -> DbResult<()>;

    /// Close the session. Idempotent; never fails.
    async fn disconnect(&mut self);

    /// Whether the session currently answers the probe query.
    async fn is_alive(&mut self) -> bool;

    /// Run a read query and return all rows. `auto_close` releases the
    /// session after the call regardless of outcome.
    async fn select(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        auto_close: bool,
    ) -> DbResult<Vec<SqlRow>>;

    /// Run a mutating statement; `commit` issues a commit on success.
    async fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        auto_close: bool,
        commit: bool,
    ) -> DbResult<ExecOutcome>;

    async fn commit(&mut self) -> DbResult<()>;

    async fn rollback(&mut self) -> DbResult<()>;

    /// Opaque correlation token attached to this session's log records.
    fn session_id(&self) -> Uuid;
}

/// A single database session over an engine backend.
pub struct Connection<B> {
    args: ConnectionArgs,
    session_id: Uuid,
    reconnect_retries: u32,
    backend: B,
}

impl<B: SqlBackend> Connection<B> {
    pub fn new(backend: B, args: ConnectionArgs) -> Self {
        Self { args, session_id: Uuid::new_v4(), reconnect_retries: DEFAULT_RECONNECT_RETRIES, backend }
    }

    /// Override the reconnect budget of the execution helpers.
    pub fn with_reconnect_retries(mut self, retries: u32) -> Self {
        self.reconnect_retries = retries;
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Open the session. No-op when already alive.
    ///
    /// After opening, liveness is asserted with the probe query; a session
    /// that cannot answer it is closed again and reported as a connection
    /// error.
    pub async fn connect(&mut self) -> DbResult<()> {
        if self.is_alive().await {
            return Ok(());
        }

        debug!(
            session_id = %self.session_id,
            engine = self.backend.engine(),
            host = %self.args.hostname,
            program = %self.args.program,
            "opening database session"
        );

        if let Err(error) = self.backend.open(&self.args).await {
            if error.kind() == DbErrorKind::Connection {
                return Err(error);
            }
            // Setup failed past the transport handshake; release whatever
            // was opened before re-raising.
            self.backend.close().await;
            return Err(error);
        }

        if !self.is_alive().await {
            self.backend.close().await;
            return Err(DbError::connection(format!(
                "can't connect to {} (not alive)",
                self.backend.engine()
            )));
        }

        Ok(())
    }

    /// Close the session. Idempotent; teardown errors are swallowed since
    /// the remote peer may already have closed its end.
    pub async fn disconnect(&mut self) {
        if self.backend.is_open() {
            debug!(session_id = %self.session_id, "closing database session");
        }
        self.backend.close().await;
    }

    /// Probe the session. False when no handle is held (no I/O in that
    /// case), when the probe fails, or when the result does not have the
    /// expected shape. Never raises.
    pub async fn is_alive(&mut self) -> bool {
        if !self.backend.is_open() {
            return false;
        }
        match self.backend.query(PROBE_QUERY, &[]).await {
            Ok(rows) => rows == vec![vec![SqlValue::Int(1)]],
            Err(_) => false,
        }
    }

    /// Run a read query, reconnecting on recoverable failures.
    pub async fn select(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        auto_close: bool,
    ) -> DbResult<Vec<SqlRow>> {
        self.ensure_connected().await?;
        let result = self.query_with_reconnect(sql, params).await;
        if auto_close {
            self.disconnect().await;
        }
        result
    }

    /// Run a mutating statement, reconnecting on recoverable failures.
    /// The commit (when requested) is part of the retried operation.
    pub async fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        auto_close: bool,
        commit: bool,
    ) -> DbResult<ExecOutcome> {
        self.ensure_connected().await?;
        let result = self.exec_with_reconnect(sql, params, commit).await;
        if auto_close {
            self.disconnect().await;
        }
        result
    }

    pub async fn commit(&mut self) -> DbResult<()> {
        if !self.backend.is_open() {
            return Err(DbError::connection("no open database session"));
        }
        self.backend.commit().await
    }

    pub async fn rollback(&mut self) -> DbResult<()> {
        if !self.backend.is_open() {
            return Err(DbError::connection("no open database session"));
        }
        self.backend.rollback().await
    }

    async fn ensure_connected(&mut self) -> DbResult<()> {
        self.connect().await
    }

    async fn query_with_reconnect(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>> {
        let mut retries = self.reconnect_retries;
        loop {
            match self.backend.query(sql, params).await {
                Ok(rows) => return Ok(rows),
                Err(failure) => {
                    retries = self.recover_or_raise(sql, params, failure, retries).await?;
                }
            }
        }
    }

    async fn exec_with_reconnect(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        commit: bool,
    ) -> DbResult<ExecOutcome> {
        let mut retries = self.reconnect_retries;
        loop {
            let failure = match self.backend.exec(sql, params).await {
                Ok(outcome) => {
                    if !commit {
                        return Ok(outcome);
                    }
                    match self.backend.commit().await {
                        Ok(()) => return Ok(outcome),
                        Err(failure) => failure,
                    }
                }
                Err(failure) => failure,
            };
            retries = self.recover_or_raise(sql, params, failure, retries).await?;
        }
    }

    /// Log the raw failure once; when it is recoverable and budget
    /// remains, force-close and reopen the session and hand back the
    /// decremented budget. Otherwise the failure propagates. A failed
    /// reopen propagates immediately as a connection error.
    async fn recover_or_raise(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        failure: DbError,
        retries: u32,
    ) -> DbResult<u32> {
        error!(
            session_id = %self.session_id,
            sql,
            params = ?params,
            code = ?failure.code(),
            "{failure}"
        );

        if !failure.is_retryable() || retries == 0 {
            return Err(failure);
        }

        self.backend.close().await;
        if let Err(reopen) = self.backend.open(&self.args).await {
            return Err(DbError::connection(format!("reconnect failed: {reopen}")));
        }
        Ok(retries - 1)
    }
}

#[async_trait]
impl<B: SqlBackend> DatabaseConnection for Connection<B> {
    async fn connect(&mut self) -> DbResult<()> {
        Connection::connect(self).await
    }

    async fn disconnect(&mut self) {
        Connection::disconnect(self).await;
    }

    async fn is_alive(&mut self) -> bool {
        Connection::is_alive(self).await
    }

    async fn select(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        auto_close: bool,
    ) -> DbResult<Vec<SqlRow>> {
        Connection::select(self, sql, params, auto_close).await
    }

    async fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        auto_close: bool,
        commit: bool,
    ) -> DbResult<ExecOutcome> {
        Connection::execute(self, sql, params, auto_close, commit).await
    }

    async fn commit(&mut self) -> DbResult<()> {
        Connection::commit(self).await
    }

    async fn rollback(&mut self) -> DbResult<()> {
        Connection::rollback(self).await
    }

    fn session_id(&self) -> Uuid {
        Connection::session_id(self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::super::error::ErrorCode;
    use super::super::error::{classify_mysql_code, DbErrorKind};
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Open,
        Close,
        Query(String),
        Exec(String),
        Commit,
        Rollback,
    }

    #[derive(Default)]
    struct MockState {
        open: bool,
        open_count: u32,
        events: Vec<Event>,
        query_results: VecDeque<DbResult<Vec<SqlRow>>>,
        exec_results: VecDeque<DbResult<ExecOutcome>>,
        /// Probe response override; default is the healthy shape.
        probe_rows: Option<Vec<SqlRow>>,
        /// Opens beyond this count fail.
        open_budget: Option<u32>,
    }

    #[derive(Clone)]
    struct MockBackend(Arc<Mutex<MockState>>);

    impl MockBackend {
        fn new() -> (Self, Arc<Mutex<MockState>>) {
            let state = Arc::new(Mutex::new(MockState::default()));
            (Self(Arc::clone(&state)), state)
        }
    }

    #[async_trait]
    impl SqlBackend for MockBackend {
        fn engine(&self) -> &'static str {
            "mock"
        }

        fn is_open(&self) -> bool {
            self.0.lock().unwrap().open
        }

        async fn open(&mut self, _args: &ConnectionArgs) -> DbResult<()> {
            let mut state = self.0.lock().unwrap();
            state.events.push(Event::Open);
            if let Some(budget) = state.open_budget {
                if state.open_count >= budget {
                    return Err(DbError::connection("mock refuses to open"));
                }
            }
            state.open_count += 1;
            state.open = true;
            Ok(())
        }

        async fn close(&mut self) {
            let mut state = self.0.lock().unwrap();
            state.events.push(Event::Close);
            state.open = false;
        }

        async fn query(&mut self, sql: &str, _params: &[SqlValue]) -> DbResult<Vec<SqlRow>> {
            let mut state = self.0.lock().unwrap();
            if !state.open {
                return Err(DbError::unexpected("query on closed backend"));
            }
            if sql == PROBE_QUERY {
                return Ok(state
                    .probe_rows
                    .clone()
                    .unwrap_or_else(|| vec![vec![SqlValue::Int(1)]]));
            }
            state.events.push(Event::Query(sql.to_string()));
            state.query_results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn exec(&mut self, sql: &str, _params: &[SqlValue]) -> DbResult<ExecOutcome> {
            let mut state = self.0.lock().unwrap();
            if !state.open {
                return Err(DbError::unexpected("exec on closed backend"));
            }
            state.events.push(Event::Exec(sql.to_string()));
            state.exec_results.pop_front().unwrap_or_else(|| Ok(ExecOutcome::default()))
        }

        async fn commit(&mut self) -> DbResult<()> {
            self.0.lock().unwrap().events.push(Event::Commit);
            Ok(())
        }

        async fn rollback(&mut self) -> DbResult<()> {
            self.0.lock().unwrap().events.push(Event::Rollback);
            Ok(())
        }
    }

    fn args() -> ConnectionArgs {
        ConnectionArgs {
            hostname: "localhost".to_string(),
            port: 3306,
            login: "demo".to_string(),
            password: "demo".to_string(),
            database: "demo".to_string(),
            program: "tablecat-test".to_string(),
        }
    }

    fn connection() -> (Connection<MockBackend>, Arc<Mutex<MockState>>) {
        let (backend, state) = MockBackend::new();
        (Connection::new(backend, args()), state)
    }

    fn gone_away() -> DbError {
        classify_mysql_code(2006, "MySQL server has gone away")
    }

    fn duplicate_entry() -> DbError {
        classify_mysql_code(1062, "Duplicate entry 'x' for key 'PRIMARY'")
    }

    fn statement_executions(state: &Arc<Mutex<MockState>>) -> usize {
        state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|event| matches!(event, Event::Query(_) | Event::Exec(_)))
            .count()
    }

    #[tokio::test]
    async fn is_alive_without_handle_does_no_io() {
        let (mut connection, state) = connection();

        assert!(!connection.is_alive().await);
        assert!(state.lock().unwrap().events.is_empty(), "no backend calls were made");
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let (mut connection, state) = connection();
        connection.connect().await.unwrap();
        assert!(state.lock().unwrap().open);

        connection.disconnect().await;
        assert!(!state.lock().unwrap().open);

        connection.disconnect().await;
        assert!(!state.lock().unwrap().open);
    }

    #[tokio::test]
    async fn connect_is_a_noop_when_alive() {
        let (mut connection, state) = connection();
        connection.connect().await.unwrap();
        connection.connect().await.unwrap();

        assert_eq!(state.lock().unwrap().open_count, 1);
    }

    #[tokio::test]
    async fn connect_rejects_a_session_that_fails_the_probe() {
        let (mut connection, state) = connection();
        state.lock().unwrap().probe_rows = Some(vec![vec![SqlValue::Int(0)]]);

        let error = connection.connect().await.unwrap_err();
        assert_eq!(error.kind(), DbErrorKind::Connection);
        assert!(!state.lock().unwrap().open, "the failed session was closed again");
    }

    #[tokio::test]
    async fn select_lazily_connects_exactly_once() {
        let (mut connection, state) = connection();

        let rows = connection.select("SELECT x FROM t", &[], false).await.unwrap();
        assert!(rows.is_empty());

        let events = state.lock().unwrap().events.clone();
        assert_eq!(
            events,
            vec![Event::Open, Event::Query("SELECT x FROM t".to_string())],
            "one open precedes the query"
        );
    }

    #[tokio::test]
    async fn recoverable_failure_reconnects_up_to_the_budget() {
        let (mut connection, state) = connection();
        {
            let mut locked = state.lock().unwrap();
            for _ in 0..4 {
                locked.query_results.push_back(Err(gone_away()));
            }
        }

        let error = connection.select("SELECT x FROM t", &[], false).await.unwrap_err();
        assert_eq!(error.code(), Some(&ErrorCode::Mysql(2006)));

        // 1 initial execution + 3 reconnect-and-retry rounds.
        assert_eq!(statement_executions(&state), 4);
        let locked = state.lock().unwrap();
        assert_eq!(locked.open_count, 4, "a reconnect preceded every retry");
        assert_eq!(
            locked.events.iter().filter(|event| matches!(event, Event::Close)).count(),
            3,
            "each reconnect force-closed the broken handle first"
        );
    }

    #[tokio::test]
    async fn permanent_failure_short_circuits() {
        let (mut connection, state) = connection();
        state.lock().unwrap().query_results.push_back(Err(duplicate_entry()));

        let error = connection.select("INSERT INTO t VALUES (1)", &[], false).await.unwrap_err();
        assert!(error.is_permanent_error());
        assert_eq!(statement_executions(&state), 1, "no retry for a permanent error");
    }

    #[tokio::test]
    async fn recoverable_failure_can_succeed_after_reconnect() {
        let (mut connection, state) = connection();
        {
            let mut locked = state.lock().unwrap();
            locked.query_results.push_back(Err(gone_away()));
            locked.query_results.push_back(Ok(vec![vec![SqlValue::Int(7)]]));
        }

        let rows = connection.select("SELECT x FROM t", &[], false).await.unwrap();
        assert_eq!(rows, vec![vec![SqlValue::Int(7)]]);
        assert_eq!(statement_executions(&state), 2);
    }

    #[tokio::test]
    async fn failed_reconnect_propagates_as_connection_error() {
        let (mut connection, state) = connection();
        {
            let mut locked = state.lock().unwrap();
            locked.query_results.push_back(Err(gone_away()));
            // The initial open succeeds; the reconnect does not.
            locked.open_budget = Some(1);
        }

        let error = connection.select("SELECT x FROM t", &[], false).await.unwrap_err();
        assert_eq!(error.kind(), DbErrorKind::Connection);
        assert_eq!(statement_executions(&state), 1);
    }

    #[tokio::test]
    async fn auto_close_releases_the_handle_on_success() {
        let (mut connection, state) = connection();

        connection.select("SELECT x FROM t", &[], true).await.unwrap();
        assert!(!state.lock().unwrap().open);
    }

    #[tokio::test]
    async fn auto_close_releases_the_handle_on_failure() {
        let (mut connection, state) = connection();
        {
            let mut locked = state.lock().unwrap();
            for _ in 0..4 {
                locked.query_results.push_back(Err(gone_away()));
            }
        }

        let result = connection.select("SELECT x FROM t", &[], true).await;
        assert!(result.is_err());
        assert!(!state.lock().unwrap().open, "handle released even though the query failed");
    }

    #[tokio::test]
    async fn execute_commits_as_part_of_the_operation() {
        let (mut connection, state) = connection();
        state.lock().unwrap().exec_results.push_back(Ok(ExecOutcome {
            rows_affected: 1,
            last_insert_id: Some(99),
        }));

        let outcome =
            connection.execute("INSERT INTO t VALUES (1)", &[], false, true).await.unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.last_insert_id, Some(99));

        let events = state.lock().unwrap().events.clone();
        assert!(events.contains(&Event::Commit));
    }

    #[tokio::test]
    async fn execute_without_commit_flag_skips_commit() {
        let (mut connection, state) = connection();

        connection.execute("UPDATE t SET x = 1", &[], false, false).await.unwrap();
        assert!(!state.lock().unwrap().events.contains(&Event::Commit));
    }

    #[tokio::test]
    async fn commit_and_rollback_require_an_open_session() {
        let (mut connection, _state) = connection();

        assert_eq!(connection.commit().await.unwrap_err().kind(), DbErrorKind::Connection);
        assert_eq!(connection.rollback().await.unwrap_err().kind(), DbErrorKind::Connection);
    }

    #[tokio::test]
    async fn session_id_is_stable_for_the_wrapper_lifetime() {
        let (mut connection, _state) = connection();
        let before = connection.session_id();
        connection.connect().await.unwrap();
        connection.disconnect().await;
        assert_eq!(connection.session_id(), before);
    }
}
