//! sqlspy mock - a recording double for the sqlspy client API
//!
//! Code under test talks to a [`MockConnection`] exactly as it would talk to
//! a real connection. Every statement, execution, bound parameter, returned
//! result set, row mutation, transaction call and close is recorded in the
//! connection's [`SessionState`]; responses come from fixtures programmed
//! through a [`FixtureHandler`] before the code runs.
//!
//! # Example
//!
//! ```ignore
//! let factory = MockObjectFactory::new();
//! factory
//!     .connection()
//!     .prepared_statement_fixtures()
//!     .prepare_result_set("select balance", ResultSetFixture::new("balance").row([1000]));
//! factory.register_mock_driver();
//! // ... run code that calls DriverManager::connect ...
//! factory.restore_drivers();
//! ```

mod association;
mod config;
mod connection;
mod driver;
mod factory;
mod fixtures;
pub mod lifecycle;
mod registry;
mod result_set;
mod rows;
mod state;
mod statement;
mod transaction;

pub use association::{ExecutedStatement, ResultSetAssociations, ReturnedResultSets};
pub use config::SessionConfig;
pub use connection::MockConnection;
pub use driver::{DriverManager, MockDriver};
pub use factory::MockObjectFactory;
pub use fixtures::{ColumnRef, FixtureHandler, FixtureTable, ResultSetFixture};
pub use lifecycle::{LifecycleTracker, Resource, Scope};
pub use registry::{
    Bound, OutParameters, StatementBody, StatementId, StatementKind, StatementRecord,
    StatementRegistry,
};
pub use result_set::{MockResultSet, ResultSetData, ResultSetKey};
pub use rows::RowMutations;
pub use state::{SessionSnapshot, SessionState};
pub use statement::{MockCallableStatement, MockPreparedStatement, MockStatement};
pub use transaction::{SavepointRecord, TransactionLog};

/// Re-export commonly used types from sqlspy-core
pub use sqlspy_core::{
    CallableStatement, Concurrency, Connection, DatabaseDriver, MatchOptions, ParameterKey,
    ParameterMap, ParameterSets, PreparedStatement, Result, ResultSet, Savepoint, SqlSpyError,
    Statement, StatementOptions, Value,
};
