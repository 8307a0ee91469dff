//! Session configuration
//!
//! A session is one mock connection and everything recorded on it. The
//! configuration can be built in code or loaded from TOML:
//!
//! ```toml
//! clear_parameters_on_execute = true
//! default_concurrency = "read_only"
//!
//! [matching]
//! case_sensitive = false
//! exact = false
//! regex = true
//! ```

use serde::{Deserialize, Serialize};
use sqlspy_core::{Concurrency, MatchOptions, Result, SqlSpyError};
use std::path::Path;

/// Configuration of one mock connection session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Matching rules for fixture lookup and verification
    pub matching: MatchOptions,
    /// Whether executing a prepared or callable statement clears its bound
    /// parameters after they were recorded
    pub clear_parameters_on_execute: bool,
    /// Concurrency of returned result sets when the statement did not ask
    /// for one
    pub default_concurrency: Concurrency,
    /// Name reported by the mock driver and connection
    pub driver_name: String,
    /// URL prefix accepted by the mock driver; empty accepts every URL
    pub url_prefix: String,
}

impl Default for SessionConfig {
    /// Defaults:
    /// - matching: case-insensitive substring
    /// - clear_parameters_on_execute: true
    /// - default_concurrency: read-only
    /// - driver_name: "sqlspy"
    /// - url_prefix: "" (any URL)
    fn default() -> Self {
        Self {
            matching: MatchOptions::default(),
            clear_parameters_on_execute: true,
            default_concurrency: Concurrency::ReadOnly,
            driver_name: "sqlspy".to_string(),
            url_prefix: String::new(),
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| SqlSpyError::Configuration(format!("invalid session config: {}", e)))
    }

    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading session config");
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn with_matching(mut self, matching: MatchOptions) -> Self {
        self.matching = matching;
        self
    }

    pub fn with_clear_parameters_on_execute(mut self, clear: bool) -> Self {
        self.clear_parameters_on_execute = clear;
        self
    }

    pub fn with_default_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.default_concurrency = concurrency;
        self
    }

    pub fn with_driver_name(mut self, name: impl Into<String>) -> Self {
        self.driver_name = name.into();
        self
    }

    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }
}
