//! sqlspy core - client API abstractions and shared types
//!
//! This crate defines what application code is written against and the leaf
//! data types the recording double and its verification layer share:
//!
//! - `Connection`, `Statement`, `PreparedStatement`, `CallableStatement`,
//!   `ResultSet` - the client API
//! - `DatabaseDriver` - trait for drivers registered with the driver manager
//! - `Value` - a SQL value with type-aware equality
//! - `ParameterKey`, `ParameterMap`, `ParameterSets` - bound parameters
//! - `MatchOptions` - the SQL text matching rules

mod connection;
mod driver;
mod error;
pub mod matcher;
mod parameter;
pub mod transaction;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use matcher::MatchOptions;
pub use parameter::*;
pub use transaction::*;
pub use types::*;
