//! Client API: connection, statements and result sets
//!
//! Application code is written against these traits. Statement and
//! transaction operations are async; result sets are cursors over
//! materialised rows and are synchronous.

use crate::{Concurrency, ParameterKey, Result, Savepoint, StatementOptions, Value};
use async_trait::async_trait;

/// A database connection
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name
    fn driver_name(&self) -> &str;

    /// Create a statement that receives its SQL text at execution time
    async fn create_statement(&self) -> Result<Box<dyn Statement>> {
        self.create_statement_with(StatementOptions::default()).await
    }

    /// Create a statement with explicit options
    async fn create_statement_with(&self, options: StatementOptions)
    -> Result<Box<dyn Statement>>;

    /// Prepare a statement with positional `?` placeholders
    async fn prepare_statement(&self, sql: &str) -> Result<Box<dyn PreparedStatement>> {
        self.prepare_statement_with(sql, StatementOptions::default())
            .await
    }

    /// Prepare a statement with explicit options
    async fn prepare_statement_with(
        &self,
        sql: &str,
        options: StatementOptions,
    ) -> Result<Box<dyn PreparedStatement>>;

    /// Prepare a stored-procedure call
    async fn prepare_call(&self, sql: &str) -> Result<Box<dyn CallableStatement>>;

    /// Enable or disable auto-commit mode
    fn set_auto_commit(&self, auto_commit: bool) -> Result<()>;

    /// Whether the connection is in auto-commit mode
    fn auto_commit(&self) -> bool;

    /// Commit the current transaction
    async fn commit(&self) -> Result<()>;

    /// Roll back the current transaction
    async fn rollback(&self) -> Result<()>;

    /// Create a savepoint, named or anonymous
    async fn set_savepoint(&self, name: Option<&str>) -> Result<Savepoint>;

    /// Roll back to a previously created savepoint
    async fn rollback_to_savepoint(&self, savepoint: &Savepoint) -> Result<()>;

    /// Release a savepoint
    async fn release_savepoint(&self, savepoint: &Savepoint) -> Result<()>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// A statement whose SQL text is supplied per execution
#[async_trait]
pub trait Statement: Send + Sync {
    /// Execute any statement; returns `true` if it produced a result set
    async fn execute(&self, sql: &str) -> Result<bool>;

    /// Execute a query that returns rows
    async fn execute_query(&self, sql: &str) -> Result<Box<dyn ResultSet>>;

    /// Execute a statement that modifies data, returning the update count
    async fn execute_update(&self, sql: &str) -> Result<u64>;

    /// Queue SQL text for the next batch execution
    fn add_batch(&self, sql: &str) -> Result<()>;

    /// Execute the queued batch, returning one update count per entry
    async fn execute_batch(&self) -> Result<Vec<u64>>;

    /// The current result set of the last execution, if any
    fn result_set(&self) -> Option<Box<dyn ResultSet>>;

    /// Advance to the next result set of the last execution
    fn more_results(&self) -> bool;

    /// Close the statement
    async fn close(&self) -> Result<()>;

    /// Check if the statement is closed
    fn is_closed(&self) -> bool;
}

/// A prepared statement
#[async_trait]
pub trait PreparedStatement: Send + Sync {
    /// The SQL text the statement was prepared with
    fn sql(&self) -> &str;

    /// Bind a positional parameter (1-based)
    fn set_parameter(&self, index: usize, value: Value) -> Result<()>;

    /// Remove every bound parameter
    fn clear_parameters(&self) -> Result<()>;

    /// Queue the currently bound parameters as one batch entry
    fn add_batch(&self) -> Result<()>;

    /// Execute the prepared statement; returns `true` if it produced a result set
    async fn execute(&self) -> Result<bool>;

    /// Query the prepared statement with the bound parameters
    async fn execute_query(&self) -> Result<Box<dyn ResultSet>>;

    /// Execute the prepared statement as an update
    async fn execute_update(&self) -> Result<u64>;

    /// Execute every queued batch entry
    async fn execute_batch(&self) -> Result<Vec<u64>>;

    /// The current result set of the last execution, if any
    fn result_set(&self) -> Option<Box<dyn ResultSet>>;

    /// Advance to the next result set of the last execution
    fn more_results(&self) -> bool;

    /// Close/deallocate the prepared statement
    async fn close(&self) -> Result<()>;

    /// Check if the statement is closed
    fn is_closed(&self) -> bool;
}

/// A stored-procedure call, supporting named and output parameters
#[async_trait]
pub trait CallableStatement: PreparedStatement {
    /// Bind a named parameter
    fn set_named_parameter(&self, name: &str, value: Value) -> Result<()>;

    /// Register an output parameter with its database-specific type name
    fn register_out_parameter(&self, key: ParameterKey, data_type: &str) -> Result<()>;

    /// Value of an output parameter after execution
    fn out_parameter(&self, key: &ParameterKey) -> Result<Option<Value>>;
}

/// A cursor over the rows of a query result
///
/// Rows and columns are 1-based. The cursor starts before the first row.
pub trait ResultSet: Send + Sync {
    /// Identifier of the result set
    fn id(&self) -> String;

    fn concurrency(&self) -> Concurrency;

    fn row_count(&self) -> Result<usize>;

    fn column_count(&self) -> Result<usize>;

    /// Move to the next row; returns `false` once past the last row
    fn next(&self) -> Result<bool>;

    /// Move to the first row; returns `false` if there are no rows
    fn first(&self) -> Result<bool>;

    /// Current row number, 0 when not positioned on a row
    fn row(&self) -> Result<usize>;

    /// Value of a column in the current row
    fn get(&self, column: usize) -> Result<Value>;

    /// Value of a named column in the current row
    fn get_by_name(&self, column: &str) -> Result<Value>;

    /// Stage a new value for a column of the current row or the insert row
    fn update_value(&self, column: usize, value: Value) -> Result<()>;

    /// Write staged values into the current row
    fn update_row(&self) -> Result<()>;

    /// Delete the current row
    fn delete_row(&self) -> Result<()>;

    /// Position the cursor on the insert row
    fn move_to_insert_row(&self) -> Result<()>;

    /// Insert the insert row at the remembered cursor position
    fn insert_row(&self) -> Result<()>;

    /// Return from the insert row to the remembered cursor position
    fn move_to_current_row(&self) -> Result<()>;

    /// Close the result set
    fn close(&self) -> Result<()>;

    /// Check if the result set is closed
    fn is_closed(&self) -> bool;
}
