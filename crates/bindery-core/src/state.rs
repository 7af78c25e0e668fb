//! # State Store
//!
//! The single shared key/value store of an application, with synchronous
//! change notification.
//!
//! ## Guarantees
//!
//! - Writes are visible to the next read immediately.
//! - Every write notifies the key's listeners, then the wildcard listeners,
//!   each in registration order, even when the value did not change.
//! - Listeners may write state themselves; the store holds no borrow while
//!   they run.
//!
//! The store is a cheap-to-clone handle (`Rc`); it is not `Send` and relies on
//! the single-threaded event loop of its host.

use crate::lists::str_array;
use crate::primitives::WILDCARD_KEY;
use crate::settings::Separators;
use crate::types::{SourceTag, StateMap, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Callback invoked as `(key, new_value, source)` on every write.
pub type Listener = Rc<dyn Fn(&str, &Value, Option<&SourceTag>)>;

#[derive(Default)]
struct StoreInner {
    values: StateMap,
    listeners: BTreeMap<String, Vec<Listener>>,
    dirty: bool,
}

/// Shared handle to the application state.
#[derive(Clone, Default)]
pub struct StateStore {
    inner: Rc<RefCell<StoreInner>>,
    separators: Rc<Separators>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("StateStore")
            .field("values", &inner.values)
            .field("listener_keys", &inner.listeners.keys().collect::<Vec<_>>())
            .field("dirty", &inner.dirty)
            .finish()
    }
}

impl StateStore {
    /// Create an empty store using the default list separators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that merges delimited strings with `separators`.
    #[must_use]
    pub fn with_separators(separators: Separators) -> Self {
        Self {
            inner: Rc::default(),
            separators: Rc::new(separators),
        }
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Store `value` under `key`, notify listeners and return the prior value.
    pub fn set_state(&self, key: &str, value: Value, source: Option<&SourceTag>) -> Option<Value> {
        let previous = self
            .inner
            .borrow_mut()
            .values
            .insert(key.to_string(), value.clone());

        tracing::debug!(key, source = ?source.map(SourceTag::as_str), "state write");

        for listener in self.listeners_for(key) {
            listener(key, &value, source);
        }

        previous
    }

    /// Merge `value` into whatever `key` currently holds.
    ///
    /// - list + list: concatenation, duplicates kept
    /// - mapping + mapping: shallow merge, incoming wins
    /// - delimited string + delimited string: token concatenation, re-joined
    /// - list + scalar (or scalar + list): the scalar is promoted to a list
    /// - anything else, or an unset key: plain overwrite
    pub fn merge_state(&self, key: &str, value: Value, source: Option<&SourceTag>) {
        let Some(existing) = self.get(key) else {
            self.set_state(key, value, source);
            return;
        };

        let (existing, incoming) = match (existing, value) {
            (Value::Array(items), scalar) if is_scalar(&scalar) => {
                (Value::Array(items), Value::Array(vec![scalar]))
            }
            (scalar, Value::Array(items)) if is_scalar(&scalar) => {
                (Value::Array(vec![scalar]), Value::Array(items))
            }
            pair => pair,
        };

        let merged = match (existing, incoming) {
            (Value::Array(mut left), Value::Array(right)) => {
                left.extend(right);
                Value::Array(left)
            }
            (Value::Object(mut left), Value::Object(right)) => {
                for (k, v) in right {
                    left.insert(k, v);
                }
                Value::Object(left)
            }
            (Value::String(left), Value::String(right)) => {
                let mut tokens = self.separators.split(&left);
                tokens.extend(self.separators.split(&right));
                Value::String(self.separators.join(&tokens))
            }
            (_, incoming) => incoming,
        };

        self.set_state(key, merged, source);
    }

    /// Apply `set_state` to every entry, in mapping order.
    ///
    /// Each entry triggers its own notification pass; nothing is batched.
    pub fn set_state_bulk(&self, values: &StateMap, source: Option<&SourceTag>) {
        for (key, value) in values {
            self.set_state(key, value.clone(), source);
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Current value of `key`, or `None` when it was never written.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.borrow().values.get(key).cloned()
    }

    /// Current value of `key`, or `default` when it was never written.
    #[must_use]
    pub fn get_state(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Current value of `key` as a list of strings (empty when unset).
    pub fn get_list(&self, key: &str) -> Result<Vec<String>, crate::BinderyError> {
        match self.get(key) {
            Some(value) => str_array(&value, &self.separators),
            None => Ok(Vec::new()),
        }
    }

    /// Whether `key` was ever written (presence, not truthiness).
    #[must_use]
    pub fn has_state(&self, key: &str) -> bool {
        self.inner.borrow().values.contains_key(key)
    }

    /// Copy of every key/value pair, in first-write order.
    #[must_use]
    pub fn snapshot(&self) -> StateMap {
        self.inner.borrow().values.clone()
    }

    /// Separators this store merges delimited strings with.
    #[must_use]
    pub fn separators(&self) -> &Separators {
        &self.separators
    }

    // =========================================================================
    // LISTENERS
    // =========================================================================

    /// Register `listener` on each of `keys` (use `"*"` for every write).
    pub fn bind_state<I, S>(&self, keys: I, listener: impl Fn(&str, &Value, Option<&SourceTag>) + 'static)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let listener: Listener = Rc::new(listener);
        let mut inner = self.inner.borrow_mut();
        for key in keys {
            inner
                .listeners
                .entry(key.into())
                .or_default()
                .push(Rc::clone(&listener));
        }
    }

    /// Number of listeners registered directly on `key`.
    #[must_use]
    pub fn listener_count(&self, key: &str) -> usize {
        self.inner.borrow().listeners.get(key).map_or(0, Vec::len)
    }

    fn listeners_for(&self, key: &str) -> Vec<Listener> {
        let inner = self.inner.borrow();
        inner
            .listeners
            .get(key)
            .into_iter()
            .chain(inner.listeners.get(WILDCARD_KEY))
            .flatten()
            .cloned()
            .collect()
    }

    // =========================================================================
    // DIRTY TRACKING
    // =========================================================================

    /// Mark the state as holding unsaved edits.
    pub fn mark_dirty(&self) {
        self.inner.borrow_mut().dirty = true;
    }

    /// Mark the state as saved.
    pub fn mark_clean(&self) {
        self.inner.borrow_mut().dirty = false;
    }

    /// Whether unsaved edits exist.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.borrow().dirty
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

// =============================================================================
// TESTS
// =============================================================================
