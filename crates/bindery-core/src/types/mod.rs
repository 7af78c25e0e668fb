//! # Core Type Definitions
//!
//! This module contains the types shared by every part of the engine:
//! - State values (`Value`, `StateMap`) and JavaScript-style truthiness
//! - Source identity for feedback suppression (`SourceTag`)
//! - Surface categories (`SurfaceKind`)
//! - Error types (`BinderyError`, `TransportError`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

pub use serde_json::Value;

/// Ordered string-keyed mapping used for state patches and form data.
///
/// Iteration order is insertion order (`serde_json` is built with
/// `preserve_order`), which is the order bulk writes are applied in.
pub type StateMap = serde_json::Map<String, Value>;

// =============================================================================
// TRUTHINESS
// =============================================================================

/// Truthiness as the directive language understands it.
///
/// `null`, `false`, `0` and `""` are falsy. Lists and mappings are always
/// truthy, even when empty.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// =============================================================================
// SOURCE IDENTITY
// =============================================================================

static SOURCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of whoever performed a state write.
///
/// Load bindings compare the tag of an incoming write with their own tag and
/// skip writes they caused themselves.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceTag(String);

impl SourceTag {
    /// A fixed, human-readable tag (e.g. `"mode"`).
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// A process-unique tag such as `form#7`.
    #[must_use]
    pub fn unique(prefix: &str) -> Self {
        let n = SOURCE_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("{prefix}#{n}"))
    }

    /// Get the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// SURFACE KIND
// =============================================================================

/// The two categories of named UI surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Dialogs rendered on top of everything else; at most one is open.
    Modal,
    /// Panels making up a screen; showing one hides the others.
    Interface,
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Modal => f.write_str("modal"),
            Self::Interface => f.write_str("interface"),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors reported by a transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The remote end could not be reached.
    #[error("Cannot connect to {0}")]
    ConnectionFailed(String),

    /// The remote end answered with a non-success status.
    #[error("Server returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors that can occur in the engine.
///
/// Validation failures never show up here: they are reported to the user and
/// recovered locally. Everything below signals a programming or
/// configuration mistake and propagates to the caller.
#[derive(Debug, Error)]
pub enum BinderyError {
    /// A collaborator capability was needed but never installed.
    #[error("Requirement missing: {0}")]
    RequirementMissing(&'static str),

    /// A dotted settings path did not resolve.
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// The logical method is absent from the current method table.
    #[error("Unknown remote method: {0}")]
    UnknownRemoteMethod(String),

    /// A trigger name outside `save` / `load`.
    #[error("Unknown relation connector: {0}")]
    UnknownRelationConnector(String),

    /// Textual modal command not understood by the bridge.
    #[error("Unknown modal method: {0}")]
    UnknownModalMethod(String),

    /// Textual message command not understood by the bridge.
    #[error("Unknown message method: {0}")]
    UnknownMessageMethod(String),

    /// Textual lock command not understood by the bridge.
    #[error("Unknown lock method: {0}")]
    UnknownLockMethod(String),

    /// Textual socket command not understood by the bridge.
    #[error("Unknown socket method: {0}")]
    UnknownSocketMethod(String),

    /// The requested behaviour exists in the interface but is not supported.
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// No mode or view was defined under this name.
    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    /// No surface of this kind was defined under this name.
    #[error("Unknown {kind}: {name}")]
    UnknownSurface { kind: SurfaceKind, name: String },

    /// A method table entry names a verb the transport does not speak.
    #[error("Unknown transport verb: {0}")]
    UnknownTransportVerb(String),

    /// The method table in state is not a mapping of `name -> [verb, url]`.
    #[error("Malformed method table entry: {0}")]
    MalformedMethodTable(String),

    /// A string-list helper received something that is neither a list nor a string.
    #[error("Array or string expected")]
    ListExpected,

    /// The bootstrap state reload did not succeed.
    #[error("Bootstrap failed: {0}")]
    BootstrapFailed(String),

    /// A transport failure surfaced as an error (debug mode only).
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

// =============================================================================
// TESTS
// =============================================================================
