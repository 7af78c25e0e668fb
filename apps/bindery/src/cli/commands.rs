//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::AppConfig;
use crate::error::CliError;
use crate::scenario::{RunReport, Scenario, ScenarioRunner};
use bindery_core::{Directive, Validator, Value, changes};
use serde::Serialize;
use std::path::Path;

/// Maximum scenario file size (4 MB).
const MAX_SCENARIO_FILE_SIZE: u64 = 4 * 1024 * 1024;

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// PARSE COMMAND
// =============================================================================

/// Show the key, triggers and operators of a directive.
pub fn cmd_parse(raw: &str, json_mode: bool) -> Result<bool, CliError> {
    let directive = Directive::parse(raw);

    if json_mode {
        print_json(&directive);
    } else {
        let join = |items: Vec<&str>| items.join(", ");
        println!("Directive: {raw}");
        println!("  Key:       {}", directive.key);
        println!(
            "  Triggers:  {}",
            join(directive.triggers.iter().map(|t| t.as_str()).collect())
        );
        println!(
            "  Operators: {}",
            join(directive.operators.iter().map(|o| o.as_str()).collect())
        );
    }
    Ok(true)
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Check `value` against `rules`. Reference rules resolve to nothing here.
pub fn cmd_validate(
    config: &AppConfig,
    value: &str,
    rules: &[String],
    json_mode: bool,
) -> Result<bool, CliError> {
    let validator = Validator::new(config.settings.separators.clone());
    let valid = validator.validate(&Value::from(value), rules, &serde_json::Map::new());

    if json_mode {
        print_json(&serde_json::json!({
            "value": value,
            "rules": rules,
            "valid": valid
        }));
    } else {
        let verdict = if valid { "valid" } else { "invalid" };
        println!("{value:?} is {verdict} under [{}]", rules.join(", "));
    }
    Ok(valid)
}

// =============================================================================
// CHANGES COMMAND
// =============================================================================

/// Diff two delimited lists.
pub fn cmd_changes(
    config: &AppConfig,
    previous: &str,
    next: &str,
    json_mode: bool,
) -> Result<bool, CliError> {
    let separators = &config.settings.separators;
    let diff = changes(&separators.split(previous), &separators.split(next));

    if json_mode {
        print_json(&diff);
    } else {
        println!("Added ({}):     {}", diff.add.len(), separators.join(&diff.add));
        println!("Removed ({}):   {}", diff.rem.len(), separators.join(&diff.rem));
        println!("Unchanged ({}): {}", diff.nop.len(), separators.join(&diff.nop));
    }
    Ok(true)
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Read and parse a scenario file.
pub fn load_scenario(path: &Path) -> Result<Scenario, CliError> {
    let metadata = std::fs::metadata(path).map_err(|e| CliError::io(path, &e))?;
    if metadata.len() > MAX_SCENARIO_FILE_SIZE {
        return Err(CliError::Scenario(format!(
            "file size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_SCENARIO_FILE_SIZE
        )));
    }
    let raw = std::fs::read_to_string(path).map_err(|e| CliError::io(path, &e))?;
    Scenario::parse(&raw)
}

/// Play a scenario on a fresh `LocalSet`.
pub async fn cmd_run(
    config: AppConfig,
    path: &Path,
    json_mode: bool,
    echo: bool,
) -> Result<bool, CliError> {
    let scenario = load_scenario(path)?;
    tracing::info!(path = %path.display(), "running scenario");

    let runner = ScenarioRunner::new(config, echo && !json_mode);
    if echo && !json_mode {
        println!("Scenario: {}", path.display());
    }
    let report = tokio::task::LocalSet::new()
        .run_until(runner.run(scenario))
        .await?;

    print_report(&report, json_mode);
    Ok(report.passed())
}

fn print_report(report: &RunReport, json_mode: bool) {
    if json_mode {
        print_json(report);
        return;
    }

    println!();
    println!("Final state:");
    for (key, value) in &report.state {
        println!("  {key} = {value}");
    }
    if let Some(warning) = &report.unload_warning {
        println!("Unload warning: {warning}");
    }
    if report.passed() {
        println!("All expectations met.");
    } else {
        println!("{} expectation(s) failed:", report.failures.len());
        for failure in &report.failures {
            println!("  - {failure}");
        }
    }
}
