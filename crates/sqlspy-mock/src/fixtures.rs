//! Programmed responses
//!
//! A [`FixtureTable`] holds what executions of one statement kind return:
//! result sets, update counts, failures and callable out parameters. Entries
//! are keyed by a SQL pattern matched with the session's match options and
//! may be restricted to executions whose bound parameters contain a given
//! [`ParameterMap`]. Restricted entries are consulted first; among entries of
//! the same group the first one prepared wins.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sqlspy_core::{MatchOptions, ParameterMap, Result, Value};

use crate::{SessionState, StatementKind};

/// Tabular data returned by a matching execution
///
/// Every execution gets its own copy: same id, own cursor, own closed flag and
/// own row mutation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultSetFixture {
    pub id: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Reference to a column by 1-based position or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        ColumnRef::Index(index)
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnRef::Index(i) => write!(f, "column {}", i),
            ColumnRef::Name(n) => write!(f, "column \"{}\"", n),
        }
    }
}

/// Resolve a column reference to a 0-based position; names compare
/// case-insensitively
pub(crate) fn column_position(columns: &[String], column: &ColumnRef) -> Option<usize> {
    match column {
        ColumnRef::Index(i) if *i >= 1 && *i <= columns.len() => Some(i - 1),
        ColumnRef::Index(_) => None,
        ColumnRef::Name(name) => columns.iter().position(|c| c.eq_ignore_ascii_case(name)),
    }
}

impl ResultSetFixture {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style variant of [`ResultSetFixture::add_row`]
    pub fn row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_row(values);
        self
    }

    /// Append a row. Missing cells are NULL; extra cells get generated
    /// column names `Column<n>`.
    pub fn add_row<I, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut row: Vec<Value> = values.into_iter().map(Into::into).collect();
        while self.columns.len() < row.len() {
            let name = format!("Column{}", self.columns.len() + 1);
            self.columns.push(name);
            for existing in &mut self.rows {
                existing.push(Value::Null);
            }
        }
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Append a column. Rows are added or padded with NULL as needed.
    pub fn add_column<I, V>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let width = self.columns.len();
        self.columns.push(name.into());
        while self.rows.len() < values.len() {
            self.rows.push(vec![Value::Null; width]);
        }
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.push(values.next().unwrap_or(Value::Null));
        }
    }

    /// Parse a fixture from JSON
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Row by 1-based position
    pub fn get_row(&self, row: usize) -> Option<&[Value]> {
        row.checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .map(Vec::as_slice)
    }

    /// Every value of a column, top to bottom. Cells missing from a short
    /// row read as NULL.
    pub fn column(&self, column: &ColumnRef) -> Option<Vec<Value>> {
        let position = column_position(&self.columns, column)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(position).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }

    /// Rows padded with NULL up to the column count
    ///
    /// `rows` is public and fixtures may come from JSON, so rows shorter than
    /// `columns` can occur. Longer rows are kept as they are.
    pub fn padded_rows(&self) -> Vec<Vec<Value>> {
        let width = self.columns.len();
        self.rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                if row.len() < width {
                    row.resize(width, Value::Null);
                }
                row
            })
            .collect()
    }

    /// Copy with every row padded to the column count
    pub fn normalized(&self) -> Self {
        Self {
            id: self.id.clone(),
            columns: self.columns.clone(),
            rows: self.padded_rows(),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    pattern: String,
    parameters: Option<ParameterMap>,
    value: T,
}

fn upsert<T>(entries: &mut Vec<Entry<T>>, entry: Entry<T>) {
    match entries
        .iter_mut()
        .find(|e| e.pattern == entry.pattern && e.parameters == entry.parameters)
    {
        Some(existing) => existing.value = entry.value,
        None => entries.push(entry),
    }
}

fn lookup<'a, T>(
    entries: &'a [Entry<T>],
    sql: &str,
    parameters: &ParameterMap,
    options: &MatchOptions,
) -> Option<&'a T> {
    let restricted = entries.iter().filter(|e| {
        e.parameters
            .as_ref()
            .is_some_and(|p| parameters.contains_all(p))
    });
    let unrestricted = entries.iter().filter(|e| e.parameters.is_none());
    restricted
        .chain(unrestricted)
        .find(|e| options.matches(sql, &e.pattern))
        .map(|e| &e.value)
}

/// Programmed responses for one statement kind
#[derive(Debug, Clone, Default)]
pub struct FixtureTable {
    result_sets: Vec<Entry<Vec<ResultSetFixture>>>,
    global_result_sets: Option<Vec<ResultSetFixture>>,
    update_counts: Vec<Entry<u64>>,
    global_update_count: u64,
    failures: Vec<Entry<String>>,
    out_parameters: Vec<Entry<ParameterMap>>,
    global_out_parameters: Option<ParameterMap>,
}

impl FixtureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result sets for an execution: the first matching entry, else the
    /// global result sets
    pub fn result_sets(
        &self,
        sql: &str,
        parameters: &ParameterMap,
        options: &MatchOptions,
    ) -> Option<&[ResultSetFixture]> {
        lookup(&self.result_sets, sql, parameters, options)
            .or(self.global_result_sets.as_ref())
            .map(Vec::as_slice)
    }

    pub fn update_count(
        &self,
        sql: &str,
        parameters: &ParameterMap,
        options: &MatchOptions,
    ) -> u64 {
        lookup(&self.update_counts, sql, parameters, options)
            .copied()
            .unwrap_or(self.global_update_count)
    }

    pub fn failure(
        &self,
        sql: &str,
        parameters: &ParameterMap,
        options: &MatchOptions,
    ) -> Option<&str> {
        lookup(&self.failures, sql, parameters, options).map(String::as_str)
    }

    pub fn out_parameters(
        &self,
        sql: &str,
        parameters: &ParameterMap,
        options: &MatchOptions,
    ) -> Option<&ParameterMap> {
        lookup(&self.out_parameters, sql, parameters, options)
            .or(self.global_out_parameters.as_ref())
    }

    pub fn set_global_result_sets(&mut self, result_sets: Vec<ResultSetFixture>) {
        self.global_result_sets = Some(result_sets);
    }

    pub fn add_result_sets(
        &mut self,
        pattern: impl Into<String>,
        result_sets: Vec<ResultSetFixture>,
        parameters: Option<ParameterMap>,
    ) {
        upsert(
            &mut self.result_sets,
            Entry {
                pattern: pattern.into(),
                parameters,
                value: result_sets,
            },
        );
    }

    pub fn add_update_count(
        &mut self,
        pattern: impl Into<String>,
        count: u64,
        parameters: Option<ParameterMap>,
    ) {
        upsert(
            &mut self.update_counts,
            Entry {
                pattern: pattern.into(),
                parameters,
                value: count,
            },
        );
    }

    pub fn set_global_update_count(&mut self, count: u64) {
        self.global_update_count = count;
    }

    pub fn add_failure(&mut self, pattern: impl Into<String>, message: impl Into<String>) {
        upsert(
            &mut self.failures,
            Entry {
                pattern: pattern.into(),
                parameters: None,
                value: message.into(),
            },
        );
    }

    pub fn add_out_parameters(
        &mut self,
        pattern: impl Into<String>,
        values: ParameterMap,
        parameters: Option<ParameterMap>,
    ) {
        upsert(
            &mut self.out_parameters,
            Entry {
                pattern: pattern.into(),
                parameters,
                value: values,
            },
        );
    }

    pub fn set_global_out_parameters(&mut self, values: ParameterMap) {
        self.global_out_parameters = Some(values);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Handle for programming the responses of one statement kind on a session
#[derive(Clone)]
pub struct FixtureHandler {
    state: Arc<Mutex<SessionState>>,
    kind: StatementKind,
}

impl FixtureHandler {
    pub(crate) fn new(state: Arc<Mutex<SessionState>>, kind: StatementKind) -> Self {
        Self { state, kind }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    fn update(&self, f: impl FnOnce(&mut FixtureTable)) {
        let mut state = self.state.lock();
        f(state.fixtures_mut(self.kind));
    }

    /// Result set returned when no pattern matches
    pub fn prepare_global_result_set(&self, fixture: ResultSetFixture) {
        self.prepare_global_result_sets(vec![fixture]);
    }

    pub fn prepare_global_result_sets(&self, fixtures: Vec<ResultSetFixture>) {
        tracing::debug!(kind = %self.kind, count = fixtures.len(), "prepared global result sets");
        self.update(|table| table.set_global_result_sets(fixtures));
    }

    pub fn prepare_result_set(&self, pattern: &str, fixture: ResultSetFixture) {
        self.prepare_result_sets(pattern, vec![fixture]);
    }

    pub fn prepare_result_sets(&self, pattern: &str, fixtures: Vec<ResultSetFixture>) {
        tracing::debug!(kind = %self.kind, pattern, count = fixtures.len(), "prepared result sets");
        self.update(|table| table.add_result_sets(pattern, fixtures, None));
    }

    /// Result set returned only when the bound parameters contain `parameters`
    pub fn prepare_result_set_with_parameters(
        &self,
        pattern: &str,
        fixture: ResultSetFixture,
        parameters: ParameterMap,
    ) {
        self.prepare_result_sets_with_parameters(pattern, vec![fixture], parameters);
    }

    pub fn prepare_result_sets_with_parameters(
        &self,
        pattern: &str,
        fixtures: Vec<ResultSetFixture>,
        parameters: ParameterMap,
    ) {
        tracing::debug!(
            kind = %self.kind,
            pattern,
            parameters = %parameters,
            count = fixtures.len(),
            "prepared result sets"
        );
        self.update(|table| table.add_result_sets(pattern, fixtures, Some(parameters)));
    }

    pub fn prepare_update_count(&self, pattern: &str, count: u64) {
        tracing::debug!(kind = %self.kind, pattern, count, "prepared update count");
        self.update(|table| table.add_update_count(pattern, count, None));
    }

    pub fn prepare_update_count_with_parameters(
        &self,
        pattern: &str,
        count: u64,
        parameters: ParameterMap,
    ) {
        tracing::debug!(
            kind = %self.kind,
            pattern,
            count,
            parameters = %parameters,
            "prepared update count"
        );
        self.update(|table| table.add_update_count(pattern, count, Some(parameters)));
    }

    /// Update count returned when no pattern matches (initially 0)
    pub fn prepare_global_update_count(&self, count: u64) {
        self.update(|table| table.set_global_update_count(count));
    }

    /// Make matching executions fail with a query error after being recorded
    pub fn prepare_error(&self, pattern: &str, message: &str) {
        tracing::debug!(kind = %self.kind, pattern, error = message, "prepared failure");
        self.update(|table| table.add_failure(pattern, message));
    }

    /// Out parameter values produced by matching callable executions
    pub fn prepare_out_parameter(&self, pattern: &str, values: ParameterMap) {
        self.update(|table| table.add_out_parameters(pattern, values, None));
    }

    pub fn prepare_out_parameter_with_parameters(
        &self,
        pattern: &str,
        values: ParameterMap,
        parameters: ParameterMap,
    ) {
        self.update(|table| table.add_out_parameters(pattern, values, Some(parameters)));
    }

    pub fn prepare_global_out_parameter(&self, values: ParameterMap) {
        self.update(|table| table.set_global_out_parameters(values));
    }

    /// Forget everything prepared for this kind
    pub fn clear(&self) {
        self.update(FixtureTable::clear);
    }
}
