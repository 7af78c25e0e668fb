//! # Bindery CLI Module
//!
//! This module implements the CLI interface for Bindery.
//!
//! ## Available Commands
//!
//! - `parse` - Show how a directive is understood
//! - `validate` - Check a value against validation rules
//! - `changes` - Diff two string lists the way confirm modals do
//! - `run` - Play a JSON scenario against a headless application

mod commands;

use crate::config::AppConfig;
use crate::error::CliError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Bindery - declarative state binding
///
/// Inspect directives and validation rules, or drive a headless application
/// from a scenario file.
#[derive(Parser, Debug)]
#[command(name = "bindery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress console echo while running scenarios
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file (defaults to ./bindery.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a directive such as "<#friends"
    Parse {
        /// The directive text
        directive: String,
    },

    /// Validate a value against rules
    Validate {
        /// The value to check
        value: String,

        /// Rules, e.g. "optional" "minLen:3" "emails"
        #[arg(required = true)]
        rules: Vec<String>,
    },

    /// Show added, removed and unchanged entries between two lists
    Changes {
        /// Previous list (comma or whitespace separated)
        #[arg(short, long, default_value = "")]
        previous: String,

        /// Next list (comma or whitespace separated)
        #[arg(short, long, default_value = "")]
        next: String,
    },

    /// Run a scenario file
    Run {
        /// Path to the scenario JSON
        scenario: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Log filter used when `RUST_LOG` is unset.
#[must_use]
pub fn default_log_filter(verbose: bool) -> &'static str {
    if verbose { "bindery=debug" } else { "bindery=info" }
}

/// Execute the CLI with parsed arguments.
///
/// Returns whether the command succeeded: `validate` and `run` report a
/// negative result without it being an error.
pub async fn execute(cli: Cli) -> Result<bool, CliError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let json_mode = cli.json_mode;

    if cli.verbose {
        tracing::debug!(?config, "effective configuration");
    }

    match cli.command {
        Commands::Parse { directive } => cmd_parse(&directive, json_mode),
        Commands::Validate { value, rules } => cmd_validate(&config, &value, &rules, json_mode),
        Commands::Changes { previous, next } => cmd_changes(&config, &previous, &next, json_mode),
        Commands::Run { scenario } => cmd_run(config, &scenario, json_mode, !cli.quiet).await,
    }
}

// =============================================================================
// TESTS
// =============================================================================
