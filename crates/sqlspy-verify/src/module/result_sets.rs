use sqlspy_core::Value;
use sqlspy_mock::lifecycle::Scope;
use sqlspy_mock::{ColumnRef, ResultSetData, ResultSetFixture, RowMutations, SessionState};

use super::TestModule;
use super::statements::verify_scope_closed;
use crate::ResultSetSelector;
use crate::error::{VerifyError, VerifyResult, fail};

#[derive(Debug, Clone, Copy)]
enum RowState {
    Updated,
    Deleted,
    Inserted,
}

impl RowState {
    fn label(&self) -> &'static str {
        match self {
            RowState::Updated => "updated",
            RowState::Deleted => "deleted",
            RowState::Inserted => "inserted",
        }
    }

    fn holds(&self, mutations: &RowMutations, row: usize) -> bool {
        match self {
            RowState::Updated => mutations.is_updated(row),
            RowState::Deleted => mutations.is_deleted(row),
            RowState::Inserted => mutations.is_inserted(row),
        }
    }

    fn rows(&self, mutations: &RowMutations) -> Vec<usize> {
        match self {
            RowState::Updated => mutations.updated_rows().collect(),
            RowState::Deleted => mutations.deleted_rows().collect(),
            RowState::Inserted => mutations.inserted_rows().collect(),
        }
    }
}

impl TestModule<'_> {
    /// Row `row` (1-based) of the selected result set equals `expected`
    pub fn verify_result_set_row<I, V>(
        &self,
        selector: impl Into<ResultSetSelector>,
        row: usize,
        expected: I,
    ) -> VerifyResult
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let expected: Vec<Value> = expected.into_iter().map(Into::into).collect();
        let state = self.snapshot();
        let data = resolve(&state, &selector.into())?;
        let Some(actual) = data.get_row(row) else {
            return fail(VerifyError::RowOutOfRange {
                result_set: data.id().to_string(),
                row,
                rows: data.rows().len(),
            });
        };
        if actual == expected.as_slice() {
            return Ok(());
        }
        fail(VerifyError::RowMismatch {
            result_set: data.id().to_string(),
            row,
            expected,
            actual: actual.to_vec(),
        })
    }

    /// A column, by 1-based index or by name, of the selected result set
    /// equals `expected` top to bottom
    pub fn verify_result_set_column<I, V>(
        &self,
        selector: impl Into<ResultSetSelector>,
        column: impl Into<ColumnRef>,
        expected: I,
    ) -> VerifyResult
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let column = column.into();
        let expected: Vec<Value> = expected.into_iter().map(Into::into).collect();
        let state = self.snapshot();
        let data = resolve(&state, &selector.into())?;
        let Some(actual) = data.column(&column) else {
            return fail(VerifyError::ColumnNotFound {
                result_set: data.id().to_string(),
                column: column.to_string(),
            });
        };
        if actual == expected {
            return Ok(());
        }
        fail(VerifyError::ColumnMismatch {
            result_set: data.id().to_string(),
            column: column.to_string(),
            expected,
            actual,
        })
    }

    /// The selected result set has the same column names and rows as
    /// `expected`; identifiers are not compared
    pub fn verify_result_set_equals(
        &self,
        selector: impl Into<ResultSetSelector>,
        expected: &ResultSetFixture,
    ) -> VerifyResult {
        let state = self.snapshot();
        let data = resolve(&state, &selector.into())?;
        let actual = data.to_fixture();
        let expected = expected.normalized();
        let reason = if actual.columns != expected.columns {
            Some(format!(
                "columns {:?}, expected {:?}",
                actual.columns, expected.columns
            ))
        } else if actual.rows.len() != expected.rows.len() {
            Some(format!(
                "{} rows, expected {}",
                actual.rows.len(),
                expected.rows.len()
            ))
        } else {
            actual
                .rows
                .iter()
                .zip(&expected.rows)
                .enumerate()
                .find(|(_, (actual, expected))| actual != expected)
                .map(|(i, (actual, expected))| {
                    format!("row {} is {:?}, expected {:?}", i + 1, actual, expected)
                })
        };
        match reason {
            None => Ok(()),
            Some(reason) => fail(VerifyError::ResultSetMismatch {
                result_set: data.id().to_string(),
                reason,
            }),
        }
    }

    fn verify_row_state(
        &self,
        selector: ResultSetSelector,
        row: usize,
        row_state: RowState,
        expected: bool,
    ) -> VerifyResult {
        let state = self.snapshot();
        let data = resolve(&state, &selector)?;
        if row_state.holds(data.mutations(), row) == expected {
            return Ok(());
        }
        let state = if expected {
            format!(
                "not {} ({} rows: {:?})",
                row_state.label(),
                row_state.label(),
                row_state.rows(data.mutations())
            )
        } else {
            row_state.label().to_string()
        };
        fail(VerifyError::RowState {
            result_set: data.id().to_string(),
            row,
            state,
        })
    }

    pub fn verify_result_set_row_updated(
        &self,
        selector: impl Into<ResultSetSelector>,
        row: usize,
    ) -> VerifyResult {
        self.verify_row_state(selector.into(), row, RowState::Updated, true)
    }

    pub fn verify_result_set_row_not_updated(
        &self,
        selector: impl Into<ResultSetSelector>,
        row: usize,
    ) -> VerifyResult {
        self.verify_row_state(selector.into(), row, RowState::Updated, false)
    }

    pub fn verify_result_set_row_deleted(
        &self,
        selector: impl Into<ResultSetSelector>,
        row: usize,
    ) -> VerifyResult {
        self.verify_row_state(selector.into(), row, RowState::Deleted, true)
    }

    pub fn verify_result_set_row_not_deleted(
        &self,
        selector: impl Into<ResultSetSelector>,
        row: usize,
    ) -> VerifyResult {
        self.verify_row_state(selector.into(), row, RowState::Deleted, false)
    }

    pub fn verify_result_set_row_inserted(
        &self,
        selector: impl Into<ResultSetSelector>,
        row: usize,
    ) -> VerifyResult {
        self.verify_row_state(selector.into(), row, RowState::Inserted, true)
    }

    pub fn verify_result_set_row_not_inserted(
        &self,
        selector: impl Into<ResultSetSelector>,
        row: usize,
    ) -> VerifyResult {
        self.verify_row_state(selector.into(), row, RowState::Inserted, false)
    }

    /// Every returned result set with identifier `id` was closed
    pub fn verify_result_set_closed(&self, id: &str) -> VerifyResult {
        let state = self.snapshot();
        let keys = state.associations().by_result_set_id(id);
        if keys.is_empty() {
            return fail(VerifyError::ResultSetNotFound {
                selector: ResultSetSelector::from(id).to_string(),
            });
        }
        for (occurrence, key) in keys.iter().enumerate() {
            let closed = state.result_set(*key).is_some_and(ResultSetData::is_closed);
            if !closed {
                return fail(VerifyError::NotClosed {
                    resource: format!("result set \"{}\" (occurrence {})", id, occurrence),
                });
            }
        }
        Ok(())
    }

    /// Every result set returned from a fixture was closed
    pub fn verify_all_result_sets_closed(&self) -> VerifyResult {
        let state = self.snapshot();
        verify_scope_closed(&state, Scope::ResultSets)
    }
}

fn resolve<'s>(
    state: &'s SessionState,
    selector: &ResultSetSelector,
) -> Result<&'s ResultSetData, VerifyError> {
    let key = match selector {
        ResultSetSelector::Id(id) => state.associations().by_result_set_id(id).first().copied(),
        ResultSetSelector::Key(key) => Some(*key),
        ResultSetSelector::Statement {
            pattern,
            occurrence,
        } => {
            let matching = state.matching();
            state
                .associations()
                .all()
                .iter()
                .filter(|entry| matching.matches(&entry.execution.sql, pattern))
                .flat_map(|entry| entry.result_sets.iter().copied())
                .nth(*occurrence)
        }
    };
    match key.and_then(|key| state.result_set(key)) {
        Some(data) => Ok(data),
        None => fail(VerifyError::ResultSetNotFound {
            selector: selector.to_string(),
        }),
    }
}
