//! Session state
//!
//! Everything recorded on one mock connection lives in a [`SessionState`]
//! behind a single mutex. Handles (connection, statements, result sets,
//! fixture handlers) mutate it through the `pub(crate)` methods below; the
//! verification layer only reads it through a [`SessionSnapshot`].

use std::ops::Deref;

use indexmap::IndexMap;
use parking_lot::MutexGuard;
use sqlspy_core::{
    Concurrency, MatchOptions, ParameterKey, ParameterMap, ParameterSets, Result, SqlSpyError,
    Value,
};

use crate::lifecycle::{LifecycleTracker, Resource};
use crate::{
    ExecutedStatement, FixtureTable, ResultSetAssociations, ResultSetData, ResultSetFixture,
    ResultSetKey, SessionConfig, StatementBody, StatementId, StatementKind, StatementRecord,
    StatementRegistry, TransactionLog,
};

/// How an execution was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExecMode {
    /// `execute_query`: always yields a result set
    Query,
    /// `execute_update`: never yields a result set
    Update,
    /// `execute`: yields result sets only when a fixture matches
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    ResultSets(Vec<ResultSetKey>),
    UpdateCount(u64),
}

/// Everything recorded on one mock connection
#[derive(Debug)]
pub struct SessionState {
    config: SessionConfig,
    statements: StatementRegistry,
    executions: Vec<ExecutedStatement>,
    parameter_sets: IndexMap<String, ParameterSets>,
    associations: ResultSetAssociations,
    result_sets: Vec<ResultSetData>,
    lifecycle: LifecycleTracker,
    transactions: TransactionLog,
    plain_fixtures: FixtureTable,
    prepared_fixtures: FixtureTable,
    callable_fixtures: FixtureTable,
}

impl SessionState {
    pub(crate) fn new(config: SessionConfig) -> Self {
        let mut lifecycle = LifecycleTracker::new();
        lifecycle.track(Resource::Connection);
        Self {
            config,
            statements: StatementRegistry::new(),
            executions: Vec::new(),
            parameter_sets: IndexMap::new(),
            associations: ResultSetAssociations::new(),
            result_sets: Vec::new(),
            lifecycle,
            transactions: TransactionLog::new(),
            plain_fixtures: FixtureTable::new(),
            prepared_fixtures: FixtureTable::new(),
            callable_fixtures: FixtureTable::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Match options in effect for lookups and verification
    pub fn matching(&self) -> &MatchOptions {
        &self.config.matching
    }

    pub fn statements(&self) -> &StatementRegistry {
        &self.statements
    }

    /// Every execution, in order; a batch contributes one entry per element
    pub fn executions(&self) -> &[ExecutedStatement] {
        &self.executions
    }

    /// Parameter sets of prepared and callable executions keyed by SQL text,
    /// in first-execution order
    pub fn parameter_sets(&self) -> &IndexMap<String, ParameterSets> {
        &self.parameter_sets
    }

    /// Parameter sets of the first executed SQL text matching `pattern`
    pub fn parameter_sets_matching(&self, pattern: &str) -> Option<(&str, &ParameterSets)> {
        self.parameter_sets
            .iter()
            .find(|(sql, _)| self.config.matching.matches(sql, pattern))
            .map(|(sql, sets)| (sql.as_str(), sets))
    }

    pub fn associations(&self) -> &ResultSetAssociations {
        &self.associations
    }

    pub fn result_set(&self, key: ResultSetKey) -> Option<&ResultSetData> {
        self.result_sets.get(key.index())
    }

    pub fn lifecycle(&self) -> &LifecycleTracker {
        &self.lifecycle
    }

    pub fn transactions(&self) -> &TransactionLog {
        &self.transactions
    }

    pub fn fixtures(&self, kind: StatementKind) -> &FixtureTable {
        match kind {
            StatementKind::Plain => &self.plain_fixtures,
            StatementKind::Prepared => &self.prepared_fixtures,
            StatementKind::Callable => &self.callable_fixtures,
        }
    }

    pub fn is_statement_closed(&self, id: StatementId) -> bool {
        self.lifecycle.is_closed(Resource::Statement(id))
    }

    pub fn is_connection_closed(&self) -> bool {
        self.lifecycle.is_closed(Resource::Connection)
    }

    pub(crate) fn fixtures_mut(&mut self, kind: StatementKind) -> &mut FixtureTable {
        match kind {
            StatementKind::Plain => &mut self.plain_fixtures,
            StatementKind::Prepared => &mut self.prepared_fixtures,
            StatementKind::Callable => &mut self.callable_fixtures,
        }
    }

    pub(crate) fn matching_mut(&mut self) -> &mut MatchOptions {
        &mut self.config.matching
    }

    pub(crate) fn lifecycle_mut(&mut self) -> &mut LifecycleTracker {
        &mut self.lifecycle
    }

    pub(crate) fn transactions_mut(&mut self) -> &mut TransactionLog {
        &mut self.transactions
    }

    pub(crate) fn result_set_data(&self, key: ResultSetKey) -> Result<&ResultSetData> {
        self.result_sets
            .get(key.index())
            .ok_or_else(|| SqlSpyError::NotFound(format!("result set {}", key.index())))
    }

    pub(crate) fn result_set_data_mut(&mut self, key: ResultSetKey) -> Result<&mut ResultSetData> {
        self.result_sets
            .get_mut(key.index())
            .ok_or_else(|| SqlSpyError::NotFound(format!("result set {}", key.index())))
    }

    pub(crate) fn ensure_connection_open(&self) -> Result<()> {
        if self.is_connection_closed() {
            return Err(SqlSpyError::InvalidState("connection is closed".to_string()));
        }
        Ok(())
    }

    pub(crate) fn register_statement(
        &mut self,
        body: StatementBody,
        concurrency: Option<Concurrency>,
    ) -> Result<StatementId> {
        self.ensure_connection_open()?;
        let id = self.statements.register(body, concurrency);
        self.lifecycle.track(Resource::Statement(id));
        Ok(id)
    }

    fn open_statement(&self, id: StatementId) -> Result<&StatementRecord> {
        let record = self
            .statements
            .get(id)
            .ok_or_else(|| SqlSpyError::NotFound(format!("statement {}", id)))?;
        if self.is_statement_closed(id) {
            return Err(SqlSpyError::InvalidState(format!(
                "{} {} is closed",
                record.kind(),
                id
            )));
        }
        Ok(record)
    }

    fn open_statement_mut(&mut self, id: StatementId) -> Result<&mut StatementRecord> {
        self.open_statement(id)?;
        self.statements
            .get_mut(id)
            .ok_or_else(|| SqlSpyError::NotFound(format!("statement {}", id)))
    }

    pub(crate) fn set_parameter(
        &mut self,
        id: StatementId,
        key: ParameterKey,
        value: Value,
    ) -> Result<()> {
        let record = self.open_statement_mut(id)?;
        let kind = record.kind();
        let bound = record.bound_mut().ok_or_else(|| {
            SqlSpyError::NotSupported(format!("{} has no bound parameters", kind))
        })?;
        bound.parameters.set(key, value);
        Ok(())
    }

    pub(crate) fn clear_parameters(&mut self, id: StatementId) -> Result<()> {
        if let Some(bound) = self.open_statement_mut(id)?.bound_mut() {
            bound.parameters.clear();
        }
        Ok(())
    }

    pub(crate) fn register_out_parameter(
        &mut self,
        id: StatementId,
        key: ParameterKey,
        data_type: &str,
    ) -> Result<()> {
        let out = self
            .open_statement_mut(id)?
            .out_parameters_mut()
            .ok_or_else(|| SqlSpyError::NotSupported("not a callable statement".to_string()))?;
        out.registered.insert(key, data_type.to_string());
        Ok(())
    }

    pub(crate) fn out_parameter(
        &self,
        id: StatementId,
        key: &ParameterKey,
    ) -> Result<Option<Value>> {
        let record = self.open_statement(id)?;
        Ok(record
            .out_parameters()
            .and_then(|out| out.values.get(key))
            .cloned())
    }

    /// Queue SQL text on a plain statement
    pub(crate) fn add_plain_batch(&mut self, id: StatementId, sql: &str) -> Result<()> {
        match &mut self.open_statement_mut(id)?.body {
            StatementBody::Plain { batch } => {
                batch.push(sql.to_string());
                Ok(())
            }
            _ => Err(SqlSpyError::NotSupported(
                "SQL text can only be batched on plain statements".to_string(),
            )),
        }
    }

    /// Queue a snapshot of the bound parameters; they stay bound
    pub(crate) fn add_bound_batch(&mut self, id: StatementId) -> Result<()> {
        let bound = self
            .open_statement_mut(id)?
            .bound_mut()
            .ok_or_else(|| {
                SqlSpyError::NotSupported("plain statements batch SQL text".to_string())
            })?;
        let snapshot = bound.parameters.clone();
        bound.batch.push(snapshot);
        Ok(())
    }

    fn record_execution(&mut self, id: StatementId, sql: &str, parameters: Option<&ParameterMap>) {
        self.executions.push(ExecutedStatement {
            sql: sql.to_string(),
            statement: id,
        });
        if let Some(record) = self.statements.get_mut(id) {
            record.executed.push(sql.to_string());
        }
        if let Some(parameters) = parameters {
            self.parameter_sets
                .entry(sql.to_string())
                .or_default()
                .push(parameters.clone());
        }
        tracing::debug!(
            statement = %id,
            sql,
            parameters = %parameters.cloned().unwrap_or_default(),
            "executed"
        );
    }

    fn check_failure(
        &self,
        kind: StatementKind,
        sql: &str,
        parameters: &ParameterMap,
    ) -> Result<()> {
        match self
            .fixtures(kind)
            .failure(sql, parameters, &self.config.matching)
        {
            Some(message) => {
                tracing::debug!(sql, error = message, "execution fails as prepared");
                Err(SqlSpyError::Query(message.to_string()))
            }
            None => Ok(()),
        }
    }

    /// Copy fixtures into the session as result sets returned by `id`
    fn instantiate(
        &mut self,
        id: StatementId,
        fixtures: &[ResultSetFixture],
        concurrency: Concurrency,
        tracked: bool,
    ) -> Vec<(ResultSetKey, String)> {
        fixtures
            .iter()
            .map(|fixture| {
                let key = ResultSetKey::new(self.result_sets.len());
                self.result_sets
                    .push(ResultSetData::from_fixture(fixture, concurrency, id));
                if tracked {
                    self.lifecycle.track(Resource::ResultSet(key));
                }
                (key, fixture.id.clone())
            })
            .collect()
    }

    /// Run one execution of statement `id`
    ///
    /// Plain statements pass the SQL text; prepared and callable statements
    /// pass `None` and execute their defining text with the bound parameters.
    /// The execution is recorded before any programmed failure is raised.
    pub(crate) fn execute(
        &mut self,
        id: StatementId,
        sql: Option<&str>,
        mode: ExecMode,
    ) -> Result<Outcome> {
        let record = self.open_statement(id)?;
        let kind = record.kind();
        let concurrency = record
            .concurrency()
            .unwrap_or(self.config.default_concurrency);
        let bound = record.bound().map(|b| (b.sql.clone(), b.parameters.clone()));
        let (sql, parameters) = match (bound, sql) {
            (Some((sql, parameters)), _) => (sql, Some(parameters)),
            (None, Some(sql)) => (sql.to_string(), None),
            (None, None) => {
                return Err(SqlSpyError::Query("no SQL text to execute".to_string()));
            }
        };
        let lookup_parameters = parameters.clone().unwrap_or_default();

        self.record_execution(id, &sql, parameters.as_ref());
        if self.config.clear_parameters_on_execute {
            if let Some(bound) = self.statements.get_mut(id).and_then(|r| r.bound_mut()) {
                bound.parameters.clear();
            }
        }
        self.check_failure(kind, &sql, &lookup_parameters)?;

        if kind == StatementKind::Callable {
            let values = self
                .fixtures(kind)
                .out_parameters(&sql, &lookup_parameters, &self.config.matching)
                .cloned()
                .unwrap_or_default();
            if let Some(out) = self.statements.get_mut(id).and_then(|r| r.out_parameters_mut()) {
                out.values = values;
            }
        }

        let fixtures = match mode {
            ExecMode::Update => None,
            ExecMode::Query | ExecMode::Any => self
                .fixtures(kind)
                .result_sets(&sql, &lookup_parameters, &self.config.matching)
                .map(<[ResultSetFixture]>::to_vec),
        };
        tracing::debug!(
            statement = %id,
            hit = fixtures.is_some(),
            "result set fixture lookup"
        );

        let outcome = match (fixtures, mode) {
            (Some(fixtures), _) if !fixtures.is_empty() => {
                let returned = self.instantiate(id, &fixtures, concurrency, true);
                let keys = returned.iter().map(|(key, _)| *key).collect();
                self.associations.record_execution(
                    ExecutedStatement {
                        sql: sql.clone(),
                        statement: id,
                    },
                    returned,
                );
                Outcome::ResultSets(keys)
            }
            (_, ExecMode::Query) => {
                let empty = ResultSetFixture::default();
                let returned =
                    self.instantiate(id, std::slice::from_ref(&empty), concurrency, false);
                Outcome::ResultSets(returned.into_iter().map(|(key, _)| key).collect())
            }
            _ => Outcome::UpdateCount(self.fixtures(kind).update_count(
                &sql,
                &lookup_parameters,
                &self.config.matching,
            )),
        };

        if let Some(record) = self.statements.get_mut(id) {
            record.results = match &outcome {
                Outcome::ResultSets(keys) => keys.clone(),
                Outcome::UpdateCount(_) => Vec::new(),
            };
            record.current_result = 0;
        }
        Ok(outcome)
    }

    /// Execute every queued batch element, returning one update count each
    pub(crate) fn execute_batch(&mut self, id: StatementId) -> Result<Vec<u64>> {
        let clear_parameters = self.config.clear_parameters_on_execute;
        let record = self.open_statement_mut(id)?;
        let kind = record.kind();
        record.results.clear();
        record.current_result = 0;
        let entries: Vec<(String, Option<ParameterMap>)> = match &mut record.body {
            StatementBody::Plain { batch } => {
                std::mem::take(batch).into_iter().map(|sql| (sql, None)).collect()
            }
            StatementBody::Prepared(bound) | StatementBody::Callable(bound, _) => {
                let sql = bound.sql.clone();
                let entries = std::mem::take(&mut bound.batch)
                    .into_iter()
                    .map(|parameters| (sql.clone(), Some(parameters)))
                    .collect();
                if clear_parameters {
                    bound.parameters.clear();
                }
                entries
            }
        };

        let mut counts = Vec::with_capacity(entries.len());
        for (sql, parameters) in entries {
            self.record_execution(id, &sql, parameters.as_ref());
            let parameters = parameters.unwrap_or_default();
            self.check_failure(kind, &sql, &parameters)?;
            counts.push(
                self.fixtures(kind)
                    .update_count(&sql, &parameters, &self.config.matching),
            );
        }
        Ok(counts)
    }

    /// Current result set of the last execution of `id`
    pub(crate) fn current_result(&self, id: StatementId) -> Option<ResultSetKey> {
        let record = self.statements.get(id)?;
        record.results.get(record.current_result).copied()
    }

    /// Advance to the next result set of the last execution
    pub(crate) fn more_results(&mut self, id: StatementId) -> bool {
        match self.statements.get_mut(id) {
            Some(record) if record.current_result < record.results.len() => {
                record.current_result += 1;
                record.current_result < record.results.len()
            }
            _ => false,
        }
    }

    pub(crate) fn close_statement(&mut self, id: StatementId) {
        self.lifecycle.mark_closed(Resource::Statement(id));
        tracing::debug!(statement = %id, "statement closed");
    }

    pub(crate) fn close_connection(&mut self) {
        self.lifecycle.mark_closed(Resource::Connection);
        tracing::debug!("connection closed");
    }
}

/// Read access to a session, holding its lock until dropped
pub struct SessionSnapshot<'a> {
    guard: MutexGuard<'a, SessionState>,
}

impl<'a> SessionSnapshot<'a> {
    pub(crate) fn new(guard: MutexGuard<'a, SessionState>) -> Self {
        Self { guard }
    }
}

impl Deref for SessionSnapshot<'_> {
    type Target = SessionState;

    fn deref(&self) -> &SessionState {
        &self.guard
    }
}
