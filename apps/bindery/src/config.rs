//! # Configuration
//!
//! `bindery.toml` holds engine settings overrides and transport options:
//!
//! ```toml
//! [settings.network]
//! success = "Saved!"
//! poll_ms = 10000
//!
//! [transport]
//! base_url = "http://127.0.0.1:8080"
//! timeout_secs = 10
//! ```
//!
//! Every section is optional. Without an explicit `--config`, a missing
//! `bindery.toml` in the working directory yields the defaults.

use crate::error::CliError;
use bindery_core::Settings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "bindery.toml";

/// Root of `bindery.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub settings: Settings,
    pub transport: TransportConfig,
}

/// `[transport]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Prefix for relative method-table URLs. Empty means URLs are used as is.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: 30,
        }
    }
}

impl TransportConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Parse a configuration document.
    pub fn from_toml(raw: &str, origin: &Path) -> Result<Self, CliError> {
        toml::from_str(raw).map_err(|e| CliError::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load `path`, or `bindery.toml` when present, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !required && !path.exists() {
            tracing::debug!("no configuration file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path).map_err(|e| CliError::io(&path, &e))?;
        let config = Self::from_toml(&raw, &path)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

// =============================================================================
// TESTS
// =============================================================================
