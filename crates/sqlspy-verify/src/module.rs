//! The verification facade
//!
//! A [`TestModule`] borrows a [`MockConnection`] and answers questions about
//! what was recorded on it. Query helpers return owned data or handles and
//! never fail; `verify_*` methods return `Err(VerifyError)` describing the
//! first condition that did not hold. Every call takes the session lock once
//! and releases it before returning.

mod parameters;
mod result_sets;
mod statements;
mod transactions;

use indexmap::IndexMap;
use sqlspy_core::ParameterSets;
use sqlspy_mock::{
    MockCallableStatement, MockConnection, MockPreparedStatement, MockResultSet, MockStatement,
    SavepointRecord, SessionSnapshot, SessionState, StatementKind, StatementRecord,
};

use crate::error::{VerifyError, fail};
use crate::{SavepointSelector, StatementSelector};

/// Read-only view over everything recorded on one mock connection
#[derive(Debug, Clone, Copy)]
pub struct TestModule<'a> {
    connection: &'a MockConnection,
}

impl<'a> TestModule<'a> {
    pub fn new(connection: &'a MockConnection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &'a MockConnection {
        self.connection
    }

    fn snapshot(&self) -> SessionSnapshot<'a> {
        self.connection.snapshot()
    }

    /// Match SQL text case-sensitively
    pub fn set_case_sensitive(&self, case_sensitive: bool) {
        self.connection.set_case_sensitive(case_sensitive);
    }

    /// Require patterns to equal the whole SQL text
    pub fn set_exact_match(&self, exact: bool) {
        self.connection.set_exact_match(exact);
    }

    /// Treat patterns as regular expressions matching the whole SQL text
    pub fn set_use_regular_expressions(&self, regex: bool) {
        self.connection.set_use_regular_expressions(regex);
    }

    // Statements

    /// Plain statements, in creation order
    pub fn statements(&self) -> Vec<MockStatement> {
        let state = self.snapshot();
        state
            .statements()
            .all(StatementKind::Plain)
            .filter_map(|record| self.connection.statement_handle(record))
            .collect()
    }

    pub fn statement(&self, index: usize) -> Option<MockStatement> {
        let state = self.snapshot();
        let record = state.statements().by_index(StatementKind::Plain, index)?;
        self.connection.statement_handle(record)
    }

    pub fn prepared_statements(&self) -> Vec<MockPreparedStatement> {
        self.records(StatementKind::Prepared, None)
            .iter()
            .filter_map(|record| self.connection.prepared_statement_handle(record))
            .collect()
    }

    /// Prepared statements whose SQL text matches `pattern`
    pub fn prepared_statements_matching(&self, pattern: &str) -> Vec<MockPreparedStatement> {
        self.records(StatementKind::Prepared, Some(pattern))
            .iter()
            .filter_map(|record| self.connection.prepared_statement_handle(record))
            .collect()
    }

    pub fn prepared_statement(
        &self,
        selector: impl Into<StatementSelector>,
    ) -> Option<MockPreparedStatement> {
        let record = self.record(StatementKind::Prepared, &selector.into())?;
        self.connection.prepared_statement_handle(&record)
    }

    pub fn callable_statements(&self) -> Vec<MockCallableStatement> {
        self.records(StatementKind::Callable, None)
            .iter()
            .filter_map(|record| self.connection.callable_statement_handle(record))
            .collect()
    }

    pub fn callable_statements_matching(&self, pattern: &str) -> Vec<MockCallableStatement> {
        self.records(StatementKind::Callable, Some(pattern))
            .iter()
            .filter_map(|record| self.connection.callable_statement_handle(record))
            .collect()
    }

    pub fn callable_statement(
        &self,
        selector: impl Into<StatementSelector>,
    ) -> Option<MockCallableStatement> {
        let record = self.record(StatementKind::Callable, &selector.into())?;
        self.connection.callable_statement_handle(&record)
    }

    fn records(&self, kind: StatementKind, pattern: Option<&str>) -> Vec<StatementRecord> {
        let state = self.snapshot();
        match pattern {
            Some(pattern) => state
                .statements()
                .matching(kind, pattern, state.matching())
                .into_iter()
                .cloned()
                .collect(),
            None => state.statements().all(kind).cloned().collect(),
        }
    }

    fn record(&self, kind: StatementKind, selector: &StatementSelector) -> Option<StatementRecord> {
        let state = self.snapshot();
        find_statement(&state, kind, selector).cloned()
    }

    // Executions

    /// SQL text of every execution, in order, duplicates included
    pub fn executed_sql_statements(&self) -> Vec<String> {
        self.snapshot()
            .executions()
            .iter()
            .map(|execution| execution.sql.clone())
            .collect()
    }

    /// Parameter sets of every executed prepared or callable SQL text, in
    /// first-execution order
    pub fn executed_parameter_map(&self) -> IndexMap<String, ParameterSets> {
        self.snapshot().parameter_sets().clone()
    }

    /// Parameter sets of the first executed SQL text matching `pattern`
    pub fn executed_parameter_sets(&self, pattern: &str) -> Option<ParameterSets> {
        self.snapshot()
            .parameter_sets_matching(pattern)
            .map(|(_, sets)| sets.clone())
    }

    // Result sets

    /// Result sets of every execution that produced any, in execution order
    pub fn returned_result_sets(&self) -> Vec<Vec<MockResultSet>> {
        self.snapshot()
            .associations()
            .all()
            .iter()
            .map(|entry| {
                entry
                    .result_sets
                    .iter()
                    .map(|key| self.connection.result_set_handle(*key))
                    .collect()
            })
            .collect()
    }

    /// Every returned result set with identifier `id`, in return order
    pub fn returned_result_sets_by_id(&self, id: &str) -> Vec<MockResultSet> {
        self.snapshot()
            .associations()
            .by_result_set_id(id)
            .iter()
            .map(|key| self.connection.result_set_handle(*key))
            .collect()
    }

    /// First returned result set with identifier `id`
    pub fn returned_result_set(&self, id: &str) -> Option<MockResultSet> {
        let key = self
            .snapshot()
            .associations()
            .by_result_set_id(id)
            .first()
            .copied()?;
        Some(self.connection.result_set_handle(key))
    }

    // Savepoints

    pub fn savepoints(&self) -> Vec<SavepointRecord> {
        self.snapshot().transactions().savepoints().to_vec()
    }

    pub fn savepoint(&self, selector: impl Into<SavepointSelector>) -> Option<SavepointRecord> {
        let state = self.snapshot();
        find_savepoint(&state, &selector.into()).cloned()
    }
}

pub(crate) fn find_statement<'s>(
    state: &'s SessionState,
    kind: StatementKind,
    selector: &StatementSelector,
) -> Option<&'s StatementRecord> {
    match selector {
        StatementSelector::Index(index) => state.statements().by_index(kind, *index),
        StatementSelector::Sql(pattern) => {
            state
                .statements()
                .first_matching(kind, pattern, state.matching())
        }
        StatementSelector::Id(id) => state
            .statements()
            .get(*id)
            .filter(|record| record.kind() == kind),
    }
}

pub(crate) fn require_statement<'s>(
    state: &'s SessionState,
    kind: StatementKind,
    selector: &StatementSelector,
) -> Result<&'s StatementRecord, VerifyError> {
    match find_statement(state, kind, selector) {
        Some(record) => Ok(record),
        None => fail(VerifyError::StatementNotFound {
            kind,
            selector: selector.to_string(),
        }),
    }
}

pub(crate) fn find_savepoint<'s>(
    state: &'s SessionState,
    selector: &SavepointSelector,
) -> Option<&'s SavepointRecord> {
    match selector {
        SavepointSelector::Index(index) => state.transactions().savepoint(*index),
        SavepointSelector::Name(name) => state.transactions().savepoint_named(name),
    }
}

#[cfg(test)]
mod tests;
