//! Mock result sets
//!
//! [`ResultSetData`] is the session-owned copy of a fixture handed out by one
//! execution. [`MockResultSet`] is the cursor handle given to application
//! code; it locks the session for every call.
//!
//! Cursor positions: 0 is before the first row, `1..=n` are rows, `n + 1` is
//! after the last row. The insert row is a separate buffer entered with
//! `move_to_insert_row`.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sqlspy_core::{Concurrency, Result, ResultSet, SqlSpyError, Value};

use crate::fixtures::column_position;
use crate::lifecycle::Resource;
use crate::{ColumnRef, ResultSetFixture, RowMutations, SessionState, StatementId};

/// Position of a result set in its session (0-based, creation order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultSetKey(usize);

impl ResultSetKey {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Data and cursor state of one returned result set
#[derive(Debug, Clone)]
pub struct ResultSetData {
    id: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    concurrency: Concurrency,
    statement: StatementId,
    cursor: usize,
    insert_buffer: Option<Vec<Value>>,
    pending: BTreeMap<usize, Value>,
    mutations: RowMutations,
    closed: bool,
}

impl ResultSetData {
    pub(crate) fn from_fixture(
        fixture: &ResultSetFixture,
        concurrency: Concurrency,
        statement: StatementId,
    ) -> Self {
        Self {
            id: fixture.id.clone(),
            columns: fixture.columns.clone(),
            rows: fixture.padded_rows(),
            concurrency,
            statement,
            cursor: 0,
            insert_buffer: None,
            pending: BTreeMap::new(),
            mutations: RowMutations::new(),
            closed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Statement whose execution returned this result set
    pub fn statement(&self) -> StatementId {
        self.statement
    }

    pub fn mutations(&self) -> &RowMutations {
        &self.mutations
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Row by 1-based position
    pub fn get_row(&self, row: usize) -> Option<&[Value]> {
        row.checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .map(Vec::as_slice)
    }

    /// Every value of a column, top to bottom
    pub fn column(&self, column: &ColumnRef) -> Option<Vec<Value>> {
        let position = column_position(&self.columns, column)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(position).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }

    /// Current content as a fixture, including inserted and updated rows
    pub fn to_fixture(&self) -> ResultSetFixture {
        ResultSetFixture {
            id: self.id.clone(),
            columns: self.columns.clone(),
            rows: self.rows.clone(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(SqlSpyError::InvalidState(format!(
                "result set \"{}\" is closed",
                self.id
            )));
        }
        Ok(())
    }

    fn ensure_updatable(&self) -> Result<()> {
        self.ensure_open()?;
        if self.concurrency != Concurrency::Updatable {
            return Err(SqlSpyError::NotSupported(format!(
                "result set \"{}\" is read-only",
                self.id
            )));
        }
        Ok(())
    }

    fn on_row(&self) -> bool {
        self.insert_buffer.is_none() && self.cursor >= 1 && self.cursor <= self.rows.len()
    }

    fn current_row(&self) -> Result<usize> {
        if self.on_row() {
            Ok(self.cursor)
        } else {
            Err(SqlSpyError::InvalidState(format!(
                "result set \"{}\" is not positioned on a row",
                self.id
            )))
        }
    }

    fn missing_cell(&self, row: usize, index: usize) -> SqlSpyError {
        SqlSpyError::NotFound(format!(
            "cell {} of row {} of result set \"{}\"",
            index + 1,
            row,
            self.id
        ))
    }

    fn column_index(&self, column: usize) -> Result<usize> {
        column_position(&self.columns, &ColumnRef::Index(column)).ok_or_else(|| {
            SqlSpyError::NotFound(format!(
                "column {} of result set \"{}\" (has {})",
                column,
                self.id,
                self.columns.len()
            ))
        })
    }

    pub(crate) fn row_count(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.rows.len())
    }

    pub(crate) fn column_count(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.columns.len())
    }

    pub(crate) fn next(&mut self) -> Result<bool> {
        self.ensure_open()?;
        self.insert_buffer = None;
        self.pending.clear();
        if self.cursor <= self.rows.len() {
            self.cursor += 1;
        }
        Ok(self.cursor <= self.rows.len())
    }

    pub(crate) fn first(&mut self) -> Result<bool> {
        self.ensure_open()?;
        self.insert_buffer = None;
        self.pending.clear();
        if self.rows.is_empty() {
            self.cursor = 0;
            return Ok(false);
        }
        self.cursor = 1;
        Ok(true)
    }

    pub(crate) fn row(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(if self.on_row() { self.cursor } else { 0 })
    }

    pub(crate) fn get(&self, column: usize) -> Result<Value> {
        self.ensure_open()?;
        let index = self.column_index(column)?;
        if let Some(buffer) = &self.insert_buffer {
            return buffer
                .get(index)
                .cloned()
                .ok_or_else(|| self.missing_cell(self.rows.len() + 1, index));
        }
        let row = self.current_row()?;
        self.rows
            .get(row - 1)
            .and_then(|cells| cells.get(index))
            .cloned()
            .ok_or_else(|| self.missing_cell(row, index))
    }

    pub(crate) fn get_by_name(&self, column: &str) -> Result<Value> {
        self.ensure_open()?;
        let index = column_position(&self.columns, &ColumnRef::from(column)).ok_or_else(|| {
            SqlSpyError::NotFound(format!(
                "column \"{}\" of result set \"{}\"",
                column, self.id
            ))
        })?;
        self.get(index + 1)
    }

    pub(crate) fn update_value(&mut self, column: usize, value: Value) -> Result<()> {
        self.ensure_updatable()?;
        let index = self.column_index(column)?;
        if let Some(buffer) = &mut self.insert_buffer {
            if let Some(cell) = buffer.get_mut(index) {
                *cell = value;
                return Ok(());
            }
            return Err(self.missing_cell(self.rows.len() + 1, index));
        }
        self.current_row()?;
        self.pending.insert(index, value);
        Ok(())
    }

    pub(crate) fn update_row(&mut self) -> Result<()> {
        self.ensure_updatable()?;
        let row = self.current_row()?;
        for (index, value) in std::mem::take(&mut self.pending) {
            let cell = self
                .rows
                .get_mut(row - 1)
                .and_then(|cells| cells.get_mut(index));
            match cell {
                Some(cell) => *cell = value,
                None => return Err(self.missing_cell(row, index)),
            }
        }
        self.mutations.mark_updated(row);
        tracing::debug!(result_set = %self.id, row, "row updated");
        Ok(())
    }

    pub(crate) fn delete_row(&mut self) -> Result<()> {
        self.ensure_updatable()?;
        let row = self.current_row()?;
        self.pending.clear();
        self.mutations.mark_deleted(row);
        tracing::debug!(result_set = %self.id, row, "row deleted");
        Ok(())
    }

    pub(crate) fn move_to_insert_row(&mut self) -> Result<()> {
        self.ensure_updatable()?;
        self.pending.clear();
        self.insert_buffer = Some(vec![Value::Null; self.columns.len()]);
        Ok(())
    }

    pub(crate) fn insert_row(&mut self) -> Result<()> {
        self.ensure_updatable()?;
        let Some(buffer) = self.insert_buffer.as_mut() else {
            return Err(SqlSpyError::InvalidState(format!(
                "result set \"{}\" is not on the insert row",
                self.id
            )));
        };
        let row = std::mem::replace(buffer, vec![Value::Null; self.columns.len()]);
        let position = self.cursor.clamp(1, self.rows.len() + 1);
        self.rows.insert(position - 1, row);
        self.mutations.mark_inserted(position);
        if self.cursor >= position {
            self.cursor += 1;
        }
        tracing::debug!(result_set = %self.id, row = position, "row inserted");
        Ok(())
    }

    pub(crate) fn move_to_current_row(&mut self) -> Result<()> {
        self.ensure_updatable()?;
        self.insert_buffer = None;
        Ok(())
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }
}

/// Cursor handle over a result set returned by a mock statement
#[derive(Clone)]
pub struct MockResultSet {
    state: Arc<Mutex<SessionState>>,
    key: ResultSetKey,
}

impl MockResultSet {
    pub(crate) fn new(state: Arc<Mutex<SessionState>>, key: ResultSetKey) -> Self {
        Self { state, key }
    }

    pub fn key(&self) -> ResultSetKey {
        self.key
    }

    fn read<T>(&self, f: impl FnOnce(&ResultSetData) -> Result<T>) -> Result<T> {
        let state = self.state.lock();
        f(state.result_set_data(self.key)?)
    }

    fn write<T>(&self, f: impl FnOnce(&mut ResultSetData) -> Result<T>) -> Result<T> {
        let mut state = self.state.lock();
        f(state.result_set_data_mut(self.key)?)
    }
}

impl std::fmt::Debug for MockResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockResultSet")
            .field("key", &self.key)
            .finish()
    }
}

impl ResultSet for MockResultSet {
    fn id(&self) -> String {
        self.read(|data| Ok(data.id().to_string()))
            .unwrap_or_default()
    }

    fn concurrency(&self) -> Concurrency {
        self.read(|data| Ok(data.concurrency()))
            .unwrap_or_default()
    }

    fn row_count(&self) -> Result<usize> {
        self.read(ResultSetData::row_count)
    }

    fn column_count(&self) -> Result<usize> {
        self.read(ResultSetData::column_count)
    }

    fn next(&self) -> Result<bool> {
        self.write(ResultSetData::next)
    }

    fn first(&self) -> Result<bool> {
        self.write(ResultSetData::first)
    }

    fn row(&self) -> Result<usize> {
        self.read(ResultSetData::row)
    }

    fn get(&self, column: usize) -> Result<Value> {
        self.read(|data| data.get(column))
    }

    fn get_by_name(&self, column: &str) -> Result<Value> {
        self.read(|data| data.get_by_name(column))
    }

    fn update_value(&self, column: usize, value: Value) -> Result<()> {
        self.write(|data| data.update_value(column, value))
    }

    fn update_row(&self) -> Result<()> {
        self.write(ResultSetData::update_row)
    }

    fn delete_row(&self) -> Result<()> {
        self.write(ResultSetData::delete_row)
    }

    fn move_to_insert_row(&self) -> Result<()> {
        self.write(ResultSetData::move_to_insert_row)
    }

    fn insert_row(&self) -> Result<()> {
        self.write(ResultSetData::insert_row)
    }

    fn move_to_current_row(&self) -> Result<()> {
        self.write(ResultSetData::move_to_current_row)
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.result_set_data_mut(self.key)?.close();
        state.lifecycle_mut().mark_closed(Resource::ResultSet(self.key));
        tracing::debug!(key = self.key.index(), "result set closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.read(|data| Ok(data.is_closed())).unwrap_or(true)
    }
}
