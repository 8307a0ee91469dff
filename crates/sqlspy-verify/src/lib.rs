//! Verification over a recorded mock session
//!
//! Code under test talks to a [`sqlspy_mock::MockConnection`] through the
//! client API traits. Afterwards a [`TestModule`] inspects what was recorded
//! and each `verify_*` method reports the first violated expectation as a
//! [`VerifyError`].
//!
//! ```ignore
//! let factory = MockObjectFactory::new();
//! factory.register_mock_driver();
//! bank.transfer(1, 2, 5000).await?;
//!
//! let module = TestModule::new(factory.connection());
//! module.verify_sql_statement_executed("update account")?;
//! module.verify_sql_statement_parameter("update account", 0, 1, -5000)?;
//! module.verify_committed()?;
//! module.verify_all_statements_closed()?;
//! ```

mod error;
mod module;
mod selector;

pub use error::{VerifyError, VerifyResult};
pub use module::TestModule;
pub use selector::{ResultSetSelector, SavepointSelector, StatementSelector};
