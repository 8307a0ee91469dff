//! Mock connection
//!
//! `MockConnection` is the entry point of a test session. It hands out
//! statement handles, records transaction calls, and exposes the fixture
//! handlers used to program responses before the code under test runs.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlspy_core::{
    CallableStatement, Connection, PreparedStatement, Result, Savepoint, Statement,
    StatementOptions,
};

use crate::{
    FixtureHandler, MockCallableStatement, MockPreparedStatement, MockResultSet, MockStatement,
    ResultSetKey, SessionConfig, SessionSnapshot, SessionState, StatementBody, StatementKind,
    StatementRecord,
};

/// A recording connection
///
/// Clones share the same session.
#[derive(Clone)]
pub struct MockConnection {
    state: Arc<Mutex<SessionState>>,
    driver_name: String,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let driver_name = config.driver_name.clone();
        Self {
            state: Arc::new(Mutex::new(SessionState::new(config))),
            driver_name,
        }
    }

    /// Lock the session for reading
    ///
    /// Drop the snapshot before calling back into the connection or any of
    /// its handles.
    pub fn snapshot(&self) -> SessionSnapshot<'_> {
        SessionSnapshot::new(self.state.lock())
    }

    /// Fixture handler for one statement kind
    pub fn fixtures(&self, kind: StatementKind) -> FixtureHandler {
        FixtureHandler::new(self.state.clone(), kind)
    }

    pub fn statement_fixtures(&self) -> FixtureHandler {
        self.fixtures(StatementKind::Plain)
    }

    pub fn prepared_statement_fixtures(&self) -> FixtureHandler {
        self.fixtures(StatementKind::Prepared)
    }

    pub fn callable_statement_fixtures(&self) -> FixtureHandler {
        self.fixtures(StatementKind::Callable)
    }

    pub fn set_case_sensitive(&self, case_sensitive: bool) {
        self.state.lock().matching_mut().case_sensitive = case_sensitive;
    }

    pub fn set_exact_match(&self, exact: bool) {
        self.state.lock().matching_mut().exact = exact;
    }

    pub fn set_use_regular_expressions(&self, regex: bool) {
        self.state.lock().matching_mut().regex = regex;
    }

    /// Handle to a previously created plain statement
    pub fn statement_handle(&self, record: &StatementRecord) -> Option<MockStatement> {
        match record.kind() {
            StatementKind::Plain => Some(MockStatement::new(self.state.clone(), record.id())),
            _ => None,
        }
    }

    /// Handle to a previously created prepared statement
    pub fn prepared_statement_handle(
        &self,
        record: &StatementRecord,
    ) -> Option<MockPreparedStatement> {
        match (record.kind(), record.sql()) {
            (StatementKind::Prepared, Some(sql)) => Some(MockPreparedStatement::new(
                self.state.clone(),
                record.id(),
                sql.to_string(),
            )),
            _ => None,
        }
    }

    /// Handle to a previously created callable statement
    pub fn callable_statement_handle(
        &self,
        record: &StatementRecord,
    ) -> Option<MockCallableStatement> {
        match (record.kind(), record.sql()) {
            (StatementKind::Callable, Some(sql)) => Some(MockCallableStatement::new(
                self.state.clone(),
                record.id(),
                sql.to_string(),
            )),
            _ => None,
        }
    }

    /// Handle to a result set returned earlier on this connection
    pub fn result_set_handle(&self, key: ResultSetKey) -> MockResultSet {
        MockResultSet::new(self.state.clone(), key)
    }

    /// Create a plain statement, returning the concrete handle
    pub fn create_mock_statement(&self, options: StatementOptions) -> Result<MockStatement> {
        let id = self
            .state
            .lock()
            .register_statement(StatementBody::plain(), options.concurrency)?;
        Ok(MockStatement::new(self.state.clone(), id))
    }

    /// Prepare a statement, returning the concrete handle
    pub fn prepare_mock_statement(
        &self,
        sql: &str,
        options: StatementOptions,
    ) -> Result<MockPreparedStatement> {
        let id = self
            .state
            .lock()
            .register_statement(StatementBody::prepared(sql), options.concurrency)?;
        Ok(MockPreparedStatement::new(
            self.state.clone(),
            id,
            sql.to_string(),
        ))
    }

    /// Prepare a call, returning the concrete handle
    pub fn prepare_mock_call(&self, sql: &str) -> Result<MockCallableStatement> {
        let id = self
            .state
            .lock()
            .register_statement(StatementBody::callable(sql), None)?;
        Ok(MockCallableStatement::new(
            self.state.clone(),
            id,
            sql.to_string(),
        ))
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnection")
            .field("driver_name", &self.driver_name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        &self.driver_name
    }

    async fn create_statement_with(
        &self,
        options: StatementOptions,
    ) -> Result<Box<dyn Statement>> {
        Ok(Box::new(self.create_mock_statement(options)?))
    }

    async fn prepare_statement_with(
        &self,
        sql: &str,
        options: StatementOptions,
    ) -> Result<Box<dyn PreparedStatement>> {
        Ok(Box::new(self.prepare_mock_statement(sql, options)?))
    }

    async fn prepare_call(&self, sql: &str) -> Result<Box<dyn CallableStatement>> {
        Ok(Box::new(self.prepare_mock_call(sql)?))
    }

    fn set_auto_commit(&self, auto_commit: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_connection_open()?;
        state.transactions_mut().set_auto_commit(auto_commit);
        tracing::debug!(auto_commit, "auto-commit changed");
        Ok(())
    }

    fn auto_commit(&self) -> bool {
        self.state.lock().transactions().auto_commit()
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_connection_open()?;
        state.transactions_mut().commit();
        tracing::debug!(commits = state.transactions().commits(), "commit");
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_connection_open()?;
        state.transactions_mut().rollback();
        tracing::debug!(rollbacks = state.transactions().rollbacks(), "rollback");
        Ok(())
    }

    async fn set_savepoint(&self, name: Option<&str>) -> Result<Savepoint> {
        let mut state = self.state.lock();
        state.ensure_connection_open()?;
        let savepoint = state.transactions_mut().set_savepoint(name);
        tracing::debug!(savepoint = %savepoint, "savepoint set");
        Ok(savepoint)
    }

    async fn rollback_to_savepoint(&self, savepoint: &Savepoint) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_connection_open()?;
        state.transactions_mut().rollback_to(savepoint)?;
        tracing::debug!(savepoint = %savepoint, "rolled back to savepoint");
        Ok(())
    }

    async fn release_savepoint(&self, savepoint: &Savepoint) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_connection_open()?;
        state.transactions_mut().release(savepoint)?;
        tracing::debug!(savepoint = %savepoint, "savepoint released");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().close_connection();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.lock().is_connection_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResultSetFixture;
    use pretty_assertions::assert_eq;
    use sqlspy_core::{Concurrency, Value};

    #[tokio::test]
    async fn test_statements_are_registered_per_kind() {
        let connection = MockConnection::new();
        connection.create_statement().await.unwrap();
        connection.prepare_statement("select").await.unwrap();
        connection.prepare_statement("update").await.unwrap();
        connection.prepare_call("{call a()}").await.unwrap();

        let state = connection.snapshot();
        assert_eq!(state.statements().count(StatementKind::Plain), 1);
        assert_eq!(state.statements().count(StatementKind::Prepared), 2);
        assert_eq!(state.statements().count(StatementKind::Callable), 1);
        assert_eq!(
            state
                .statements()
                .by_index(StatementKind::Prepared, 1)
                .and_then(|r| r.sql()),
            Some("update")
        );
    }

    #[tokio::test]
    async fn test_savepoints_and_transactions() {
        let connection = MockConnection::new();
        connection.set_auto_commit(false).unwrap();
        let first = connection.set_savepoint(None).await.unwrap();
        let second = connection.set_savepoint(Some("name")).await.unwrap();
        connection.rollback_to_savepoint(&first).await.unwrap();
        connection.release_savepoint(&second).await.unwrap();
        connection.commit().await.unwrap();

        assert!(!connection.auto_commit());
        let state = connection.snapshot();
        let log = state.transactions();
        assert_eq!(log.commits(), 1);
        assert_eq!(log.rollbacks(), 1);
        assert!(log.savepoint(0).unwrap().rolled_back);
        assert!(log.savepoint_named("name").unwrap().released);
    }

    #[tokio::test]
    async fn test_unknown_savepoint_is_not_found() {
        let connection = MockConnection::new();
        let err = connection
            .rollback_to_savepoint(&Savepoint::anonymous(7))
            .await
            .unwrap_err();
        assert!(matches!(err, sqlspy_core::SqlSpyError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_closed_connection_refuses_statements() {
        let connection = MockConnection::new();
        connection.close().await.unwrap();
        assert!(connection.is_closed());
        assert!(connection.create_statement().await.is_err());
        assert!(connection.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_updatable_statement_returns_updatable_result_set() {
        let connection = MockConnection::new();
        connection
            .statement_fixtures()
            .prepare_global_result_set(ResultSetFixture::new("rs").row([1]));
        let statement = connection
            .create_statement_with(StatementOptions::updatable())
            .await
            .unwrap();
        let rs = statement.execute_query("select").await.unwrap();
        assert_eq!(rs.concurrency(), Concurrency::Updatable);
        assert!(rs.next().unwrap());
        rs.update_value(1, Value::from(2)).unwrap();
        rs.update_row().unwrap();
    }

    #[tokio::test]
    async fn test_matching_toggles() {
        let connection = MockConnection::new();
        connection.set_case_sensitive(true);
        connection.set_exact_match(true);
        connection.set_use_regular_expressions(true);
        let state = connection.snapshot();
        assert!(state.matching().case_sensitive);
        assert!(state.matching().exact);
        assert!(state.matching().regex);
    }

    #[tokio::test]
    async fn test_handles_rebuilt_from_records() {
        let connection = MockConnection::new();
        connection.prepare_statement("select a").await.unwrap();
        let record = connection
            .snapshot()
            .statements()
            .by_index(StatementKind::Prepared, 0)
            .cloned()
            .unwrap();
        let handle = connection.prepared_statement_handle(&record).unwrap();
        assert_eq!(handle.sql(), "select a");
        assert!(connection.statement_handle(&record).is_none());
    }
}
