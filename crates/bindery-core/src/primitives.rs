//! # Fixed Primitives
//!
//! Constants of the binding language and of the surface/form lifecycles.
//! These are compiled in; everything user-facing (texts, class names) lives in
//! [`Settings`](crate::settings::Settings) instead.

use std::time::Duration;

/// Listener key that receives every state write.
pub const WILDCARD_KEY: &str = "*";

/// State key holding the remote method table.
pub const METHODS_KEY: &str = "methods";

/// Logical method used to reload the whole state from the backend.
pub const STATE_LOAD_METHOD: &str = "state.load";

/// Source tag used for writes performed by mode activation.
pub const MODE_SOURCE: &str = "mode";

/// Leading character of a form key that is a selector rather than a field name.
pub const SELECTOR_MARKER: char = '$';

/// How long the submit action stays disabled after a click.
pub const SUBMIT_COOLDOWN: Duration = Duration::from_millis(1500);

/// Pause between closing one modal and opening the next in a swap.
pub const MODAL_SWAP_DELAY: Duration = Duration::from_millis(100);

/// Offline response that stands for "answer with the current state".
pub const OFFLINE_STATE_SENTINEL: &str = "%state%";

/// Offline response key used when no URL-specific response exists.
pub const OFFLINE_FALLBACK_URL: &str = "*";

/// Default simulated latency of the offline transport.
pub const DEFAULT_OFFLINE_LATENCY_MS: u64 = 3000;

/// Message shown when a submitted form fails validation and no custom text was given.
pub const DEFAULT_FORM_ERROR: &str = "Please correct your submission and try again.";

/// Message a confirm surface lists when one side of the difference is empty.
pub const DEFAULT_CONFIRM_EMPTY: &str = "No changes.";

/// Title an alert surface shows when none was supplied.
pub const DEFAULT_ALERT_TITLE: &str = "New Alert";
