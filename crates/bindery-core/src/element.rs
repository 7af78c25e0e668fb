//! # Elements
//!
//! The engine never touches a concrete widget toolkit. Hosts hand it
//! [`Element`] handles: anything with a kind, an optional name and id, a
//! class list, a value slot, and change/blur/click events.
//!
//! [`MemoryElement`] is a complete headless implementation used by the
//! scenario runner and the tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Shared handle to a host element.
pub type ElementRef = Rc<dyn Element>;

/// Event callback.
pub type Handler = Rc<dyn Fn()>;

/// How an element exposes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Boolean `checked` state.
    Checkbox,
    /// Editable text value.
    Input,
    /// Anything else; its text content is the value.
    Plain,
}

/// Events the engine listens for or raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Change,
    Blur,
    Click,
}

/// Capability contract for a host element.
///
/// All methods take `&self`: elements are shared between forms, bindings and
/// surfaces, so implementations use interior mutability.
pub trait Element {
    fn kind(&self) -> ElementKind;
    fn id(&self) -> Option<String>;
    fn name(&self) -> Option<String>;

    fn has_class(&self, class: &str) -> bool;
    fn add_class(&self, class: &str);
    fn remove_class(&self, class: &str);

    fn checked(&self) -> bool;
    fn set_checked(&self, checked: bool);
    fn input_value(&self) -> String;
    fn set_input_value(&self, value: &str);
    fn text(&self) -> String;
    fn set_text(&self, text: &str);

    fn is_disabled(&self) -> bool;
    fn set_disabled(&self, disabled: bool);

    /// Raise `event`, running every registered handler in registration order.
    fn trigger(&self, event: EventKind);
    /// Register `handler` for `event`.
    fn listen(&self, event: EventKind, handler: Handler);
}

/// Whether `element` matches a simple selector.
///
/// Supported forms: `.class`, `#id`, `[name=x]` and a bare name.
#[must_use]
pub fn matches(element: &dyn Element, selector: &str) -> bool {
    let selector = selector.trim();
    if let Some(class) = selector.strip_prefix('.') {
        return element.has_class(class);
    }
    if let Some(id) = selector.strip_prefix('#') {
        return element.id().as_deref() == Some(id);
    }
    if let Some(inner) = selector.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return match inner.split_once('=') {
            Some(("name", value)) => {
                element.name().as_deref() == Some(value.trim_matches(|c| c == '"' || c == '\''))
            }
            Some(_) => false,
            None => inner == "name" && element.name().is_some(),
        };
    }
    element.name().as_deref() == Some(selector)
}

// =============================================================================
// MEMORY ELEMENT
// =============================================================================

/// Headless element backed by plain fields.
pub struct MemoryElement {
    kind: ElementKind,
    id: Option<String>,
    name: Option<String>,
    classes: RefCell<BTreeSet<String>>,
    checked: Cell<bool>,
    value: RefCell<String>,
    text: RefCell<String>,
    disabled: Cell<bool>,
    handlers: RefCell<BTreeMap<EventKind, Vec<Handler>>>,
}

impl std::fmt::Debug for MemoryElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryElement")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("name", &self.name)
            .field("classes", &self.classes.borrow())
            .field("checked", &self.checked.get())
            .field("value", &self.value.borrow())
            .field("text", &self.text.borrow())
            .field("disabled", &self.disabled.get())
            .finish()
    }
}

impl MemoryElement {
    fn new(kind: ElementKind, name: Option<String>) -> Self {
        Self {
            kind,
            id: None,
            name,
            classes: RefCell::default(),
            checked: Cell::new(false),
            value: RefCell::default(),
            text: RefCell::default(),
            disabled: Cell::new(false),
            handlers: RefCell::default(),
        }
    }

    /// A named text input.
    #[must_use]
    pub fn input(name: impl Into<String>) -> Self {
        Self::new(ElementKind::Input, Some(name.into()))
    }

    /// A named checkbox.
    #[must_use]
    pub fn checkbox(name: impl Into<String>) -> Self {
        Self::new(ElementKind::Checkbox, Some(name.into()))
    }

    /// An unnamed plain element (label, button, container).
    #[must_use]
    pub fn plain() -> Self {
        Self::new(ElementKind::Plain, None)
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_class(self, class: impl Into<String>) -> Self {
        self.classes.borrow_mut().insert(class.into());
        self
    }

    /// Wrap into a shared handle.
    #[must_use]
    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// Simulate a user typing `value` and leaving the field.
    pub fn type_text(&self, value: &str) {
        match self.kind {
            ElementKind::Checkbox => self.checked.set(!value.is_empty() && value != "false"),
            ElementKind::Input => *self.value.borrow_mut() = value.to_string(),
            ElementKind::Plain => *self.text.borrow_mut() = value.to_string(),
        }
        self.trigger(EventKind::Change);
    }

    /// Simulate a click, unless the element is disabled.
    pub fn click(&self) {
        if !self.disabled.get() {
            self.trigger(EventKind::Click);
        }
    }

    /// Current class list.
    #[must_use]
    pub fn classes(&self) -> Vec<String> {
        self.classes.borrow().iter().cloned().collect()
    }
}

impl Element for MemoryElement {
    fn kind(&self) -> ElementKind {
        self.kind
    }

    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.borrow().contains(class)
    }

    fn add_class(&self, class: &str) {
        self.classes.borrow_mut().insert(class.to_string());
    }

    fn remove_class(&self, class: &str) {
        self.classes.borrow_mut().remove(class);
    }

    fn checked(&self) -> bool {
        self.checked.get()
    }

    fn set_checked(&self, checked: bool) {
        self.checked.set(checked);
    }

    fn input_value(&self) -> String {
        self.value.borrow().clone()
    }

    fn set_input_value(&self, value: &str) {
        *self.value.borrow_mut() = value.to_string();
    }

    fn text(&self) -> String {
        self.text.borrow().clone()
    }

    fn set_text(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
    }

    fn is_disabled(&self) -> bool {
        self.disabled.get()
    }

    fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }

    fn trigger(&self, event: EventKind) {
        let handlers: Vec<Handler> = self
            .handlers
            .borrow()
            .get(&event)
            .cloned()
            .unwrap_or_default();
        for handler in handlers {
            handler();
        }
    }

    fn listen(&self, event: EventKind, handler: Handler) {
        self.handlers.borrow_mut().entry(event).or_default().push(handler);
    }
}

// =============================================================================
// TESTS
// =============================================================================
