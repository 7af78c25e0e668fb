//! # Settings
//!
//! Named, user-facing options: texts, CSS-like class names, timeouts and list
//! separators. Every section has defaults so a partial TOML file (or none at
//! all) yields a usable configuration.

use crate::types::{BinderyError, Value};
use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub states: StateTexts,
    pub actions: ActionClasses,
    pub changes: ChangeSlots,
    pub alert: AlertSlots,
    pub types: TypeClasses,
    pub messages: MessageClasses,
    pub loading: LoadingSettings,
    pub validation: ValidationClasses,
    pub network: NetworkSettings,
    pub separators: Separators,
}

impl Settings {
    /// Look up an option by dotted path, e.g. `"network.failure"`.
    pub fn opt(&self, path: &str) -> Result<Value, BinderyError> {
        let mut current = serde_json::to_value(self)
            .map_err(|_| BinderyError::UnknownOption(path.to_string()))?;

        for segment in path.split('.') {
            current = match current {
                Value::Object(mut map) => map
                    .remove(segment)
                    .ok_or_else(|| BinderyError::UnknownOption(path.to_string()))?,
                _ => return Err(BinderyError::UnknownOption(path.to_string())),
            };
        }

        Ok(current)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateTexts {
    /// Warning returned by the unload guard while state is dirty.
    pub unsaved: String,
}

impl Default for StateTexts {
    fn default() -> Self {
        Self {
            unsaved: "You have unsaved changes.".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionClasses {
    pub save: String,
    pub cancel: String,
}

impl Default for ActionClasses {
    fn default() -> Self {
        Self {
            save: "save".into(),
            cancel: "cancel".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeSlots {
    pub added: String,
    pub added_count: String,
    pub removed: String,
    pub removed_count: String,
}

impl Default for ChangeSlots {
    fn default() -> Self {
        Self {
            added: "added".into(),
            added_count: "added-count".into(),
            removed: "removed".into(),
            removed_count: "removed-count".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSlots {
    pub title: String,
    pub message: String,
}

impl Default for AlertSlots {
    fn default() -> Self {
        Self {
            title: "title".into(),
            message: "message".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeClasses {
    pub modal: String,
    pub interface: String,
    pub view: String,
}

impl Default for TypeClasses {
    fn default() -> Self {
        Self {
            modal: "modal".into(),
            interface: "interface".into(),
            view: "view".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageClasses {
    pub information: String,
    pub inner: String,
    pub important: String,
}

impl Default for MessageClasses {
    fn default() -> Self {
        Self {
            information: "message-info".into(),
            inner: "inner".into(),
            important: "important".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingSettings {
    pub overlay: String,
    pub message: String,
    /// Milliseconds after which a stuck loading indicator hides itself.
    pub timeout_ms: u64,
}

impl Default for LoadingSettings {
    fn default() -> Self {
        Self {
            overlay: "loading-overlay".into(),
            message: "Loading...".into(),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationClasses {
    pub good: String,
    pub bad: String,
}

impl Default for ValidationClasses {
    fn default() -> Self {
        Self {
            good: "valid".into(),
            bad: "error".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub success: String,
    pub failure: String,
    /// Milliseconds between two polls of a remote subscription.
    pub poll_ms: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            success: "Your changes have been saved.".into(),
            failure: "We couldn't save your changes.".into(),
            poll_ms: 30_000,
        }
    }
}

/// How string lists are split and joined.
///
/// Whitespace always separates tokens; `delimiters` adds further characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Separators {
    pub delimiters: String,
    pub joiner: String,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            delimiters: ",".into(),
            joiner: ", ".into(),
        }
    }
}

impl Separators {
    /// Split a delimited string into its non-empty tokens.
    #[must_use]
    pub fn split(&self, raw: &str) -> Vec<String> {
        raw.split(|c: char| c.is_whitespace() || self.delimiters.contains(c))
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Join tokens back into a single display string.
    #[must_use]
    pub fn join(&self, tokens: &[String]) -> String {
        tokens.join(&self.joiner)
    }
}

// =============================================================================
// TESTS
// =============================================================================
