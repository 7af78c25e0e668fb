//! # CLI Errors
//!
//! Everything a command can fail with. Engine errors pass through unchanged.

use bindery_core::BinderyError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// Engine failure.
    #[error(transparent)]
    Core(#[from] BinderyError),

    /// A file could not be read.
    #[error("Cannot read {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// The configuration file is not valid TOML for [`crate::config::AppConfig`].
    #[error("Invalid configuration {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// The scenario file is not a valid scenario.
    #[error("Invalid scenario: {0}")]
    Scenario(String),

    /// The HTTP client could not be built.
    #[error("Transport setup failed: {0}")]
    TransportSetup(String),
}

impl CliError {
    pub(crate) fn io(path: &std::path::Path, error: &std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }
}
