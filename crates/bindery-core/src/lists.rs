//! # String-List Helpers
//!
//! The binding language treats "a list of strings" and "a delimited string"
//! interchangeably. These helpers convert between the two and compute the
//! difference shown by confirm surfaces.

use crate::settings::Separators;
use crate::types::{BinderyError, Value};
use serde::Serialize;

/// Interpret a value as a list of strings.
///
/// Lists are taken element-wise, strings are split on the configured
/// separators. Anything else is rejected.
pub fn str_array(value: &Value, separators: &Separators) -> Result<Vec<String>, BinderyError> {
    match value {
        Value::Array(items) => Ok(items.iter().map(|v| scalar_text(v, separators)).collect()),
        Value::String(s) => Ok(separators.split(s)),
        _ => Err(BinderyError::ListExpected),
    }
}

/// Join a list of strings into one display string.
#[must_use]
pub fn array_str(items: &[String], separators: &Separators) -> String {
    separators.join(items)
}

/// Wrap a non-list value into a one-element list.
#[must_use]
pub fn ensure_array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Render a value as the text a field would display.
///
/// `null` renders empty and lists are joined.
#[must_use]
pub fn value_text(value: &Value, separators: &Separators) -> String {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(|v| scalar_text(v, separators)).collect();
            array_str(&parts, separators)
        }
        other => scalar_text(other, separators),
    }
}

fn scalar_text(value: &Value, separators: &Separators) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(_) => value_text(value, separators),
        other => other.to_string(),
    }
}

/// Difference between a previous and a next list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Changes {
    /// In `next` but not in `previous`, in `next` order.
    pub add: Vec<String>,
    /// In `previous` but not in `next`, in `previous` order.
    pub rem: Vec<String>,
    /// In both, in `previous` order.
    pub nop: Vec<String>,
}

impl Changes {
    /// Whether anything was added or removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.rem.is_empty()
    }
}

/// Compute what changed between `previous` and `next`.
#[must_use]
pub fn changes(previous: &[String], next: &[String]) -> Changes {
    let add = next
        .iter()
        .filter(|v| !previous.contains(*v))
        .cloned()
        .collect();
    let (nop, rem): (Vec<String>, Vec<String>) =
        previous.iter().cloned().partition(|v| next.contains(v));

    Changes { add, rem, nop }
}

// =============================================================================
// TESTS
// =============================================================================
