//! Verification failures

use sqlspy_core::{ParameterKey, ParameterMap, Value};
use sqlspy_mock::StatementKind;
use thiserror::Error;

/// A verified condition did not hold
///
/// Every variant names what was looked up and, where it applies, the
/// expected and actual values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerifyError {
    #[error("expected {expected} {what}, found {actual}")]
    Count {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("no {kind} matching {selector}")]
    StatementNotFound {
        kind: StatementKind,
        selector: String,
    },

    #[error("{kind} matching {pattern} is present")]
    StatementPresent { kind: StatementKind, pattern: String },

    #[error("no SQL statement matching \"{pattern}\" ({matching}) was executed")]
    NotExecuted { pattern: String, matching: String },

    #[error("SQL statement matching \"{pattern}\" ({matching}) was executed")]
    Executed { pattern: String, matching: String },

    #[error("no parameter sets recorded for \"{pattern}\"")]
    NoParameterSets { pattern: String },

    #[error("parameter set {index} of \"{pattern}\" does not exist ({len} recorded)")]
    ParameterSetOutOfRange {
        pattern: String,
        index: usize,
        len: usize,
    },

    #[error("parameter {key} not present in {context}")]
    ParameterMissing { context: String, key: ParameterKey },

    #[error("parameter {key} present in {context}")]
    ParameterPresent { context: String, key: ParameterKey },

    #[error("parameter {key} in {context}: expected {expected:?}, got {actual:?}")]
    ParameterMismatch {
        context: String,
        key: ParameterKey,
        expected: Value,
        actual: Value,
    },

    #[error("{context}: expected {expected} parameters, got {actual}")]
    ParameterCountMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("{context}: expected parameters {expected}, got {actual}")]
    ParameterMapMismatch {
        context: String,
        expected: ParameterMap,
        actual: ParameterMap,
    },

    #[error("out parameter {key} not registered on {context}")]
    OutParameterNotRegistered { context: String, key: ParameterKey },

    #[error("{0}")]
    Transaction(String),

    #[error("expected {expected} {what}, recorded {actual}")]
    TransactionCount {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("no savepoint {selector}")]
    SavepointNotFound { selector: String },

    #[error("{savepoint} is {state}")]
    SavepointState { savepoint: String, state: String },

    #[error("no returned result set {selector}")]
    ResultSetNotFound { selector: String },

    #[error("result set \"{result_set}\" has no row {row} ({rows} rows)")]
    RowOutOfRange {
        result_set: String,
        row: usize,
        rows: usize,
    },

    #[error("result set \"{result_set}\" has no column {column}")]
    ColumnNotFound { result_set: String, column: String },

    #[error("row {row} of result set \"{result_set}\": expected {expected:?}, got {actual:?}")]
    RowMismatch {
        result_set: String,
        row: usize,
        expected: Vec<Value>,
        actual: Vec<Value>,
    },

    #[error(
        "column {column} of result set \"{result_set}\": expected {expected:?}, got {actual:?}"
    )]
    ColumnMismatch {
        result_set: String,
        column: String,
        expected: Vec<Value>,
        actual: Vec<Value>,
    },

    #[error("result set \"{result_set}\" differs: {reason}")]
    ResultSetMismatch { result_set: String, reason: String },

    #[error("row {row} of result set \"{result_set}\" is {state}")]
    RowState {
        result_set: String,
        row: usize,
        state: String,
    },

    #[error("{resource} is not closed")]
    NotClosed { resource: String },
}

/// Result of a verification
pub type VerifyResult = std::result::Result<(), VerifyError>;

/// Log a failure at debug level and turn it into an `Err`
pub(crate) fn fail<T>(error: VerifyError) -> Result<T, VerifyError> {
    tracing::debug!(error = %error, "verification failed");
    Err(error)
}
