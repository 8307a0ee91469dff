//! Mock statement handles
//!
//! Handles are cheap clones of the session pointer plus the statement id.
//! Every call locks the session, records what happened and returns the
//! programmed response.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlspy_core::{
    CallableStatement, ParameterKey, ParameterMap, PreparedStatement, Result, ResultSet,
    SqlSpyError, Statement, Value,
};

use crate::state::{ExecMode, Outcome};
use crate::{MockResultSet, ResultSetKey, SessionState, StatementId};

fn single_result_set(outcome: Outcome) -> Result<ResultSetKey> {
    match outcome {
        Outcome::ResultSets(keys) => keys
            .first()
            .copied()
            .ok_or_else(|| SqlSpyError::Query("query returned no result set".to_string())),
        Outcome::UpdateCount(_) => Err(SqlSpyError::Query(
            "query returned no result set".to_string(),
        )),
    }
}

fn update_count(outcome: Outcome) -> u64 {
    match outcome {
        Outcome::UpdateCount(count) => count,
        Outcome::ResultSets(_) => 0,
    }
}

/// Handle to a plain statement
#[derive(Clone)]
pub struct MockStatement {
    state: Arc<Mutex<SessionState>>,
    id: StatementId,
}

impl MockStatement {
    pub(crate) fn new(state: Arc<Mutex<SessionState>>, id: StatementId) -> Self {
        Self { state, id }
    }

    pub fn id(&self) -> StatementId {
        self.id
    }

    fn run(&self, sql: &str, mode: ExecMode) -> Result<Outcome> {
        self.state.lock().execute(self.id, Some(sql), mode)
    }
}

impl std::fmt::Debug for MockStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStatement").field("id", &self.id).finish()
    }
}

#[async_trait]
impl Statement for MockStatement {
    async fn execute(&self, sql: &str) -> Result<bool> {
        Ok(matches!(
            self.run(sql, ExecMode::Any)?,
            Outcome::ResultSets(_)
        ))
    }

    async fn execute_query(&self, sql: &str) -> Result<Box<dyn ResultSet>> {
        let key = single_result_set(self.run(sql, ExecMode::Query)?)?;
        Ok(Box::new(MockResultSet::new(self.state.clone(), key)))
    }

    async fn execute_update(&self, sql: &str) -> Result<u64> {
        Ok(update_count(self.run(sql, ExecMode::Update)?))
    }

    fn add_batch(&self, sql: &str) -> Result<()> {
        self.state.lock().add_plain_batch(self.id, sql)
    }

    async fn execute_batch(&self) -> Result<Vec<u64>> {
        self.state.lock().execute_batch(self.id)
    }

    fn result_set(&self) -> Option<Box<dyn ResultSet>> {
        let key = self.state.lock().current_result(self.id)?;
        Some(Box::new(MockResultSet::new(self.state.clone(), key)))
    }

    fn more_results(&self) -> bool {
        self.state.lock().more_results(self.id)
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().close_statement(self.id);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.lock().is_statement_closed(self.id)
    }
}

/// Handle to a prepared statement
#[derive(Clone)]
pub struct MockPreparedStatement {
    state: Arc<Mutex<SessionState>>,
    id: StatementId,
    sql: String,
}

impl MockPreparedStatement {
    pub(crate) fn new(state: Arc<Mutex<SessionState>>, id: StatementId, sql: String) -> Self {
        Self { state, id, sql }
    }

    pub fn id(&self) -> StatementId {
        self.id
    }

    /// Parameters bound for the next execution
    pub fn parameters(&self) -> ParameterMap {
        self.state
            .lock()
            .statements()
            .get(self.id)
            .and_then(|record| record.parameters().cloned())
            .unwrap_or_default()
    }

    /// Bind a parameter by position or name
    pub fn set(&self, key: impl Into<ParameterKey>, value: impl Into<Value>) -> Result<()> {
        self.state
            .lock()
            .set_parameter(self.id, key.into(), value.into())
    }

    fn run(&self, mode: ExecMode) -> Result<Outcome> {
        self.state.lock().execute(self.id, None, mode)
    }
}

impl std::fmt::Debug for MockPreparedStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPreparedStatement")
            .field("id", &self.id)
            .field("sql", &self.sql)
            .finish()
    }
}

#[async_trait]
impl PreparedStatement for MockPreparedStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn set_parameter(&self, index: usize, value: Value) -> Result<()> {
        self.set(index, value)
    }

    fn clear_parameters(&self) -> Result<()> {
        self.state.lock().clear_parameters(self.id)
    }

    fn add_batch(&self) -> Result<()> {
        self.state.lock().add_bound_batch(self.id)
    }

    async fn execute(&self) -> Result<bool> {
        Ok(matches!(self.run(ExecMode::Any)?, Outcome::ResultSets(_)))
    }

    async fn execute_query(&self) -> Result<Box<dyn ResultSet>> {
        let key = single_result_set(self.run(ExecMode::Query)?)?;
        Ok(Box::new(MockResultSet::new(self.state.clone(), key)))
    }

    async fn execute_update(&self) -> Result<u64> {
        Ok(update_count(self.run(ExecMode::Update)?))
    }

    async fn execute_batch(&self) -> Result<Vec<u64>> {
        self.state.lock().execute_batch(self.id)
    }

    fn result_set(&self) -> Option<Box<dyn ResultSet>> {
        let key = self.state.lock().current_result(self.id)?;
        Some(Box::new(MockResultSet::new(self.state.clone(), key)))
    }

    fn more_results(&self) -> bool {
        self.state.lock().more_results(self.id)
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().close_statement(self.id);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.lock().is_statement_closed(self.id)
    }
}

/// Handle to a callable statement
#[derive(Clone, Debug)]
pub struct MockCallableStatement {
    inner: MockPreparedStatement,
}

impl MockCallableStatement {
    pub(crate) fn new(state: Arc<Mutex<SessionState>>, id: StatementId, sql: String) -> Self {
        Self {
            inner: MockPreparedStatement::new(state, id, sql),
        }
    }

    pub fn id(&self) -> StatementId {
        self.inner.id
    }

    /// Parameters bound for the next execution, positional and named
    pub fn parameters(&self) -> ParameterMap {
        self.inner.parameters()
    }

    pub fn set(&self, key: impl Into<ParameterKey>, value: impl Into<Value>) -> Result<()> {
        self.inner.set(key, value)
    }
}

#[async_trait]
impl PreparedStatement for MockCallableStatement {
    fn sql(&self) -> &str {
        self.inner.sql()
    }

    fn set_parameter(&self, index: usize, value: Value) -> Result<()> {
        self.inner.set_parameter(index, value)
    }

    fn clear_parameters(&self) -> Result<()> {
        self.inner.clear_parameters()
    }

    fn add_batch(&self) -> Result<()> {
        PreparedStatement::add_batch(&self.inner)
    }

    async fn execute(&self) -> Result<bool> {
        PreparedStatement::execute(&self.inner).await
    }

    async fn execute_query(&self) -> Result<Box<dyn ResultSet>> {
        PreparedStatement::execute_query(&self.inner).await
    }

    async fn execute_update(&self) -> Result<u64> {
        PreparedStatement::execute_update(&self.inner).await
    }

    async fn execute_batch(&self) -> Result<Vec<u64>> {
        PreparedStatement::execute_batch(&self.inner).await
    }

    fn result_set(&self) -> Option<Box<dyn ResultSet>> {
        PreparedStatement::result_set(&self.inner)
    }

    fn more_results(&self) -> bool {
        PreparedStatement::more_results(&self.inner)
    }

    async fn close(&self) -> Result<()> {
        PreparedStatement::close(&self.inner).await
    }

    fn is_closed(&self) -> bool {
        PreparedStatement::is_closed(&self.inner)
    }
}

#[async_trait]
impl CallableStatement for MockCallableStatement {
    fn set_named_parameter(&self, name: &str, value: Value) -> Result<()> {
        self.inner.set(name, value)
    }

    fn register_out_parameter(&self, key: ParameterKey, data_type: &str) -> Result<()> {
        self.inner
            .state
            .lock()
            .register_out_parameter(self.inner.id, key, data_type)
    }

    fn out_parameter(&self, key: &ParameterKey) -> Result<Option<Value>> {
        self.inner.state.lock().out_parameter(self.inner.id, key)
    }
}
