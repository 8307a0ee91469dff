//! Database driver trait definition

use crate::{Connection, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// A database driver, registered with the process-wide driver manager
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Get the driver name
    fn name(&self) -> &str;

    /// Whether this driver handles the given connection URL
    fn accepts_url(&self, url: &str) -> bool;

    /// Open a connection for the given URL
    async fn connect(&self, url: &str) -> Result<Arc<dyn Connection>>;
}
