//! Mock driver and the process-wide driver manager
//!
//! Application code obtains connections through [`DriverManager::connect`].
//! Tests swap the registered drivers for a [`MockDriver`] with
//! [`DriverManager::install_mock_driver`] and put the originals back with
//! [`DriverManager::restore_drivers`].

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use sqlspy_core::{Connection, DatabaseDriver, Result, SqlSpyError};

use crate::MockConnection;

/// Driver that hands out one shared mock connection for every URL it accepts
#[derive(Debug, Clone)]
pub struct MockDriver {
    connection: MockConnection,
    name: String,
    url_prefix: String,
}

impl MockDriver {
    pub fn new(connection: MockConnection) -> Self {
        let (name, url_prefix) = {
            let state = connection.snapshot();
            (
                state.config().driver_name.clone(),
                state.config().url_prefix.clone(),
            )
        };
        Self {
            connection,
            name,
            url_prefix,
        }
    }

    pub fn connection(&self) -> &MockConnection {
        &self.connection
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_url(&self, url: &str) -> bool {
        url.starts_with(&self.url_prefix)
    }

    async fn connect(&self, url: &str) -> Result<Arc<dyn Connection>> {
        if !self.accepts_url(url) {
            return Err(SqlSpyError::Connection(format!(
                "driver {} does not accept {}",
                self.name, url
            )));
        }
        tracing::debug!(driver = %self.name, url, "mock connection handed out");
        Ok(Arc::new(self.connection.clone()))
    }
}

#[derive(Default)]
struct ManagerState {
    drivers: Vec<Arc<dyn DatabaseDriver>>,
    /// Drivers registered before the mock driver was installed
    saved: Option<Vec<Arc<dyn DatabaseDriver>>>,
}

static MANAGER: Lazy<Mutex<ManagerState>> = Lazy::new(|| Mutex::new(ManagerState::default()));

/// Process-wide registry of database drivers
pub struct DriverManager;

impl DriverManager {
    /// Register a driver; it is consulted after the drivers registered before it
    pub fn register_driver(driver: Arc<dyn DatabaseDriver>) {
        tracing::debug!(driver = driver.name(), "registering driver");
        MANAGER.lock().drivers.push(driver);
    }

    /// Remove every driver with the given name, returning how many were removed
    pub fn deregister_driver(name: &str) -> usize {
        let mut manager = MANAGER.lock();
        let before = manager.drivers.len();
        manager.drivers.retain(|driver| driver.name() != name);
        before - manager.drivers.len()
    }

    /// Names of the registered drivers, in registration order
    pub fn driver_names() -> Vec<String> {
        MANAGER
            .lock()
            .drivers
            .iter()
            .map(|driver| driver.name().to_string())
            .collect()
    }

    pub fn drivers() -> Vec<Arc<dyn DatabaseDriver>> {
        MANAGER.lock().drivers.clone()
    }

    /// Open a connection through the first driver accepting `url`
    pub async fn connect(url: &str) -> Result<Arc<dyn Connection>> {
        let driver = MANAGER
            .lock()
            .drivers
            .iter()
            .find(|driver| driver.accepts_url(url))
            .cloned()
            .ok_or_else(|| SqlSpyError::Connection(format!("no suitable driver for {}", url)))?;
        driver.connect(url).await
    }

    /// Replace every registered driver with `driver`
    ///
    /// The drivers registered before the first install are saved once;
    /// installing again only swaps the mock driver.
    pub fn install_mock_driver(driver: Arc<MockDriver>) {
        let mut manager = MANAGER.lock();
        if manager.saved.is_none() {
            let drivers = std::mem::take(&mut manager.drivers);
            manager.saved = Some(drivers);
        }
        manager.drivers = vec![driver as Arc<dyn DatabaseDriver>];
        tracing::info!(
            saved = manager.saved.as_ref().map_or(0, Vec::len),
            "mock driver installed"
        );
    }

    /// Put back the drivers saved by [`install_mock_driver`](Self::install_mock_driver)
    ///
    /// Does nothing when no mock driver is installed.
    pub fn restore_drivers() {
        let mut manager = MANAGER.lock();
        if let Some(saved) = manager.saved.take() {
            tracing::info!(restored = saved.len(), "drivers restored");
            manager.drivers = saved;
        }
    }

    pub fn is_mock_installed() -> bool {
        MANAGER.lock().saved.is_some()
    }
}
