//! # Directive Parser
//!
//! A directive is a state key prefixed by at most two symbols: one trigger
//! symbol and one operator symbol, in either order.
//!
//! | Symbol | Class    | Meaning                      |
//! |--------|----------|------------------------------|
//! | `>`    | trigger  | save only (field to state)   |
//! | `<`    | trigger  | load only (state to field)   |
//! | `*`    | trigger  | save and load (default)      |
//! | `=`    | operator | assign (default)             |
//! | `#`    | operator | count                        |
//! | `~`    | operator | merge                        |
//! | `^`    | operator | first                        |
//! | `?`    | operator | default-if-empty             |
//!
//! Scanning stops at the first character that is not a symbol, or that
//! belongs to a class already consumed. That character and everything after
//! it form the key, so a mistyped prefix silently becomes part of the key.

use crate::types::BinderyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of prefix characters examined.
const PREFIX_LEN: usize = 2;

// =============================================================================
// TRIGGER
// =============================================================================

/// Direction of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Field to state.
    Save,
    /// State to field.
    Load,
}

impl Trigger {
    /// Both directions, in evaluation order.
    pub const BOTH: [Self; 2] = [Self::Save, Self::Load];

    fn from_symbol(symbol: char) -> Option<&'static [Self]> {
        match symbol {
            '>' => Some(&[Self::Save]),
            '<' => Some(&[Self::Load]),
            '*' => Some(&Self::BOTH),
            _ => None,
        }
    }

    /// Textual name (`"save"` / `"load"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Load => "load",
        }
    }
}

impl FromStr for Trigger {
    type Err = BinderyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "save" => Ok(Self::Save),
            "load" => Ok(Self::Load),
            other => Err(BinderyError::UnknownRelationConnector(other.to_string())),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// OPERATOR
// =============================================================================

/// What a binding does with the value it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Assign,
    Count,
    Merge,
    First,
    Default,
}

impl Operator {
    fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '=' => Some(Self::Assign),
            '#' => Some(Self::Count),
            '~' => Some(Self::Merge),
            '^' => Some(Self::First),
            '?' => Some(Self::Default),
            _ => None,
        }
    }

    /// Textual name (`"assign"`, `"count"`, ...).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::Count => "count",
            Self::Merge => "merge",
            Self::First => "first",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// DIRECTIVE
// =============================================================================

/// A parsed directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// The state key the binding reads or writes.
    pub key: String,
    /// Directions the binding applies to.
    pub triggers: Vec<Trigger>,
    /// Operators applied for each matching trigger, in order.
    pub operators: Vec<Operator>,
}

impl Directive {
    /// Parse a directive. Never fails: unknown symbols become part of the key.
    #[must_use]
    pub fn parse(directive: &str) -> Self {
        let mut triggers: Option<&'static [Trigger]> = None;
        let mut operator: Option<Operator> = None;
        let mut consumed = 0;

        for symbol in directive.chars().take(PREFIX_LEN) {
            if triggers.is_none()
                && let Some(found) = Trigger::from_symbol(symbol)
            {
                triggers = Some(found);
            } else if operator.is_none()
                && let Some(found) = Operator::from_symbol(symbol)
            {
                operator = Some(found);
            } else {
                break;
            }
            consumed += symbol.len_utf8();
        }

        Self {
            key: directive[consumed..].to_string(),
            triggers: triggers.unwrap_or(&Trigger::BOTH).to_vec(),
            operators: vec![operator.unwrap_or(Operator::Assign)],
        }
    }

    /// Whether this directive applies in the given direction.
    #[must_use]
    pub fn applies_to(&self, trigger: Trigger) -> bool {
        self.triggers.contains(&trigger)
    }
}

impl FromStr for Directive {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

// =============================================================================
// TESTS
// =============================================================================
