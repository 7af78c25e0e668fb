//! # Field Adapters
//!
//! Value access for bound elements. The adapter is chosen once, when the
//! field is bound, from the element's kind.

use crate::element::{Element, ElementKind, ElementRef, EventKind};
use crate::lists::value_text;
use crate::settings::Separators;
use crate::types::{Value, is_truthy};
use std::rc::Rc;

/// Per-kind value access strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAdapter {
    /// Value is the boolean `checked` state.
    Checkbox,
    /// Value is the input text.
    Input,
    /// Value is the element's text content.
    Text,
}

impl FieldAdapter {
    #[must_use]
    pub fn for_kind(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Checkbox => Self::Checkbox,
            ElementKind::Input => Self::Input,
            ElementKind::Plain => Self::Text,
        }
    }

    fn read(self, element: &dyn Element) -> Value {
        match self {
            Self::Checkbox => Value::Bool(element.checked()),
            Self::Input => Value::String(element.input_value()),
            Self::Text => Value::String(element.text()),
        }
    }

    fn write(self, element: &dyn Element, value: &Value, separators: &Separators) {
        match self {
            Self::Checkbox => element.set_checked(is_truthy(value)),
            Self::Input => element.set_input_value(&value_text(value, separators)),
            Self::Text => element.set_text(&value_text(value, separators)),
        }
    }
}

/// An element paired with its value adapter.
#[derive(Clone)]
pub struct Field {
    element: ElementRef,
    adapter: FieldAdapter,
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.element.name())
            .field("adapter", &self.adapter)
            .finish()
    }
}

impl Field {
    /// Bind an element, resolving its adapter.
    #[must_use]
    pub fn bind(element: ElementRef) -> Self {
        let adapter = FieldAdapter::for_kind(element.kind());
        Self { element, adapter }
    }

    #[must_use]
    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    #[must_use]
    pub fn adapter(&self) -> FieldAdapter {
        self.adapter
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.element.name()
    }

    /// Current value: a boolean for checkboxes, text otherwise.
    #[must_use]
    pub fn value(&self) -> Value {
        self.adapter.read(self.element.as_ref())
    }

    /// Current value rendered as text.
    #[must_use]
    pub fn text(&self, separators: &Separators) -> String {
        value_text(&self.value(), separators)
    }

    /// Write `value` and raise a change event.
    ///
    /// Lists are joined, `null` clears the field.
    pub fn set_value(&self, value: &Value, separators: &Separators) {
        self.adapter.write(self.element.as_ref(), value, separators);
        self.element.trigger(EventKind::Change);
    }

    /// Register a change handler.
    pub fn on_change(&self, handler: impl Fn() + 'static) {
        self.element.listen(EventKind::Change, Rc::new(handler));
    }

    /// Whether two fields wrap the same element.
    #[must_use]
    pub fn same_element(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.element, &other.element)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::MemoryElement;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn adapter_is_resolved_from_kind() {
        let field = Field::bind(MemoryElement::checkbox("agree").shared());
        assert_eq!(field.adapter(), FieldAdapter::Checkbox);
        let field = Field::bind(MemoryElement::plain().shared());
        assert_eq!(field.adapter(), FieldAdapter::Text);
    }

    #[test]
    fn checkbox_reads_and_writes_booleans() {
        let field = Field::bind(MemoryElement::checkbox("agree").shared());
        let seps = Separators::default();
        assert_eq!(field.value(), json!(false));
        field.set_value(&json!("yes"), &seps);
        assert_eq!(field.value(), json!(true));
        field.set_value(&json!(0), &seps);
        assert_eq!(field.value(), json!(false));
    }

    #[test]
    fn lists_are_joined_and_null_clears() {
        let field = Field::bind(MemoryElement::input("to").shared());
        let seps = Separators::default();
        field.set_value(&json!(["a@b.com", "c@d.com"]), &seps);
        assert_eq!(field.value(), json!("a@b.com, c@d.com"));
        field.set_value(&Value::Null, &seps);
        assert_eq!(field.value(), json!(""));
        field.set_value(&json!(3), &seps);
        assert_eq!(field.value(), json!("3"));
    }

    #[test]
    fn set_value_raises_change() {
        let element = MemoryElement::plain().shared();
        let field = Field::bind(element);
        let changes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&changes);
        field.on_change(move || counter.set(counter.get() + 1));
        field.set_value(&json!("x"), &Separators::default());
        assert_eq!(changes.get(), 1);
        assert_eq!(field.text(&Separators::default()), "x");
    }
}
