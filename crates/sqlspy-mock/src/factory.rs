//! Object factory
//!
//! Builds the mock connection and mock driver of one test and wires them to
//! the driver manager on request.

use std::sync::Arc;

use crate::{DriverManager, MockConnection, MockDriver, SessionConfig};

/// Creates and owns the mock objects of a test
#[derive(Debug, Clone)]
pub struct MockObjectFactory {
    connection: MockConnection,
    driver: Arc<MockDriver>,
}

impl MockObjectFactory {
    /// Create the mock objects without touching the driver manager
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let connection = MockConnection::with_config(config);
        let driver = Arc::new(MockDriver::new(connection.clone()));
        Self { connection, driver }
    }

    /// Load the session configuration from a TOML file
    pub fn from_config_file(path: impl AsRef<std::path::Path>) -> sqlspy_core::Result<Self> {
        Ok(Self::with_config(SessionConfig::load(path)?))
    }

    pub fn connection(&self) -> &MockConnection {
        &self.connection
    }

    pub fn driver(&self) -> &Arc<MockDriver> {
        &self.driver
    }

    /// Make the driver manager hand out this factory's connection
    pub fn register_mock_driver(&self) {
        DriverManager::install_mock_driver(self.driver.clone());
    }

    /// Put back the drivers that were registered before the mock driver
    pub fn restore_drivers(&self) {
        DriverManager::restore_drivers();
    }
}

impl Default for MockObjectFactory {
    fn default() -> Self {
        Self::new()
    }
}
