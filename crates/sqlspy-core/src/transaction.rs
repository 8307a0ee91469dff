//! Transaction-related types
//!
//! Commit and rollback live on the `Connection` trait; this module holds the
//! savepoint handle those operations exchange.

mod savepoint;

pub use savepoint::*;
