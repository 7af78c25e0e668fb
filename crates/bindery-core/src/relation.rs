//! # Relation Engine
//!
//! Turns parsed directives into reads and writes between fields and state.
//!
//! Two lookup tables drive everything:
//!
//! - **Evaluators**, keyed by `(Trigger, Operator)`, perform one read or write.
//!   A combination without an evaluator is skipped silently: `count`, `first`
//!   and `default` only exist for loads, `merge` only for saves.
//! - **Connectors**, keyed by `Trigger`, wire a live subscription that calls
//!   back into [`RelationEngine::execute`]. Saves listen for field changes,
//!   loads listen for state writes.
//!
//! ## Feedback Suppression
//!
//! A load connector ignores writes whose source tag equals the tag it was
//! connected with, so a field never reloads a value it just saved.
//!
//! Save connectors ignore change events raised while a load evaluator is
//! writing a field. A value pulled out of state is never pushed back into it,
//! so any number of bidirectional bindings on one key settle after one pass.

use crate::directive::{Directive, Operator, Trigger};
use crate::field::Field;
use crate::lists::str_array;
use crate::state::StateStore;
use crate::types::{BinderyError, SourceTag, Value, is_truthy};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

// =============================================================================
// EVALUATORS
// =============================================================================

/// Everything an evaluator may look at.
pub struct EvalContext<'a> {
    pub state: &'a StateStore,
    /// Key parsed from the directive.
    pub key: &'a str,
    /// Value carried by the event, if any.
    pub value: Option<&'a Value>,
    pub field: &'a Field,
    pub source: Option<&'a SourceTag>,
}

impl EvalContext<'_> {
    /// The carried value when truthy, else `fallback()`.
    fn value_or(&self, fallback: impl FnOnce() -> Value) -> Value {
        match self.value {
            Some(v) if is_truthy(v) => v.clone(),
            _ => fallback(),
        }
    }

    fn field_value(&self) -> Value {
        self.value_or(|| self.field.value())
    }

    fn state_value(&self, default: Value) -> Value {
        self.value_or(|| self.state.get_state(self.key, default))
    }

    fn state_list(&self) -> Result<Vec<String>, BinderyError> {
        match self.state_value(Value::Array(Vec::new())) {
            Value::Null => Ok(Vec::new()),
            other => str_array(&other, self.state.separators()),
        }
    }
}

/// One read or write step of a binding.
pub trait Evaluator {
    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<(), BinderyError>;
}

/// Save: overwrite the key with the field value.
pub struct SaveAssign;

impl Evaluator for SaveAssign {
    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<(), BinderyError> {
        ctx.state.set_state(ctx.key, ctx.field_value(), ctx.source);
        Ok(())
    }
}

/// Save: merge the field value into the key.
pub struct SaveMerge;

impl Evaluator for SaveMerge {
    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<(), BinderyError> {
        ctx.state.merge_state(ctx.key, ctx.field_value(), ctx.source);
        Ok(())
    }
}

/// Load: show the key's value.
pub struct LoadAssign;

impl Evaluator for LoadAssign {
    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<(), BinderyError> {
        let value = ctx.state_value(Value::String(String::new()));
        ctx.field.set_value(&value, ctx.state.separators());
        Ok(())
    }
}

/// Load: show the number of list items under the key.
pub struct LoadCount;

impl Evaluator for LoadCount {
    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<(), BinderyError> {
        let count = ctx.state_list()?.len();
        ctx.field.set_value(&Value::from(count), ctx.state.separators());
        Ok(())
    }
}

/// Load: show the first list item under the key, if any.
pub struct LoadFirst;

impl Evaluator for LoadFirst {
    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<(), BinderyError> {
        if let Some(first) = ctx.state_list()?.into_iter().next() {
            ctx.field.set_value(&Value::String(first), ctx.state.separators());
        }
        Ok(())
    }
}

/// Load: fill the field only while it is blank.
pub struct LoadDefault;

impl Evaluator for LoadDefault {
    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<(), BinderyError> {
        if ctx.field.text(ctx.state.separators()).trim().is_empty() {
            let value = ctx.state_value(Value::String(String::new()));
            ctx.field.set_value(&value, ctx.state.separators());
        }
        Ok(())
    }
}

// =============================================================================
// CONNECTORS
// =============================================================================

/// Wires a live subscription for one trigger.
pub trait Connector {
    fn connect(
        &self,
        engine: &RelationEngine,
        directive: Rc<str>,
        key: &str,
        field: &Field,
        source: Option<SourceTag>,
    );
}

/// Field changes flow into state.
pub struct SaveConnector;

impl Connector for SaveConnector {
    fn connect(
        &self,
        engine: &RelationEngine,
        directive: Rc<str>,
        _key: &str,
        field: &Field,
        source: Option<SourceTag>,
    ) {
        let engine = engine.clone();
        let bound = field.clone();
        field.on_change(move || {
            if engine.is_loading() {
                return;
            }
            engine.execute_logged(Trigger::Save, &directive, None, &bound, source.as_ref());
        });
    }
}

/// State writes flow into the field, except writes from the same source.
pub struct LoadConnector;

impl Connector for LoadConnector {
    fn connect(
        &self,
        engine: &RelationEngine,
        directive: Rc<str>,
        key: &str,
        field: &Field,
        source: Option<SourceTag>,
    ) {
        let inner = engine.clone();
        let field = field.clone();
        engine.state().bind_state([key], move |_, value, writer| {
            if source.is_some() && writer == source.as_ref() {
                return;
            }
            inner.execute_logged(Trigger::Load, &directive, Some(value), &field, source.as_ref());
        });
    }
}

// =============================================================================
// ENGINE
// =============================================================================

struct EngineInner {
    state: StateStore,
    evaluators: RefCell<BTreeMap<(Trigger, Operator), Rc<dyn Evaluator>>>,
    connectors: RefCell<BTreeMap<Trigger, Rc<dyn Connector>>>,
    /// Nesting depth of running load evaluators.
    loading: Cell<u32>,
}

/// Marks a load pass for as long as it lives.
struct LoadPass<'a> {
    depth: &'a Cell<u32>,
}

impl<'a> LoadPass<'a> {
    fn enter(depth: &'a Cell<u32>) -> Self {
        depth.set(depth.get().saturating_add(1));
        Self { depth }
    }
}

impl Drop for LoadPass<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// Registry of evaluators and connectors over one state store.
#[derive(Clone)]
pub struct RelationEngine {
    inner: Rc<EngineInner>,
}

impl std::fmt::Debug for RelationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationEngine")
            .field("evaluators", &self.inner.evaluators.borrow().keys().collect::<Vec<_>>())
            .field("connectors", &self.inner.connectors.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RelationEngine {
    /// Create an engine with the standard evaluators and connectors.
    #[must_use]
    pub fn new(state: StateStore) -> Self {
        let mut evaluators: BTreeMap<(Trigger, Operator), Rc<dyn Evaluator>> = BTreeMap::new();
        evaluators.insert((Trigger::Save, Operator::Assign), Rc::new(SaveAssign));
        evaluators.insert((Trigger::Save, Operator::Merge), Rc::new(SaveMerge));
        evaluators.insert((Trigger::Load, Operator::Assign), Rc::new(LoadAssign));
        evaluators.insert((Trigger::Load, Operator::Count), Rc::new(LoadCount));
        evaluators.insert((Trigger::Load, Operator::First), Rc::new(LoadFirst));
        evaluators.insert((Trigger::Load, Operator::Default), Rc::new(LoadDefault));

        let mut connectors: BTreeMap<Trigger, Rc<dyn Connector>> = BTreeMap::new();
        connectors.insert(Trigger::Save, Rc::new(SaveConnector));
        connectors.insert(Trigger::Load, Rc::new(LoadConnector));

        Self {
            inner: Rc::new(EngineInner {
                state,
                evaluators: RefCell::new(evaluators),
                connectors: RefCell::new(connectors),
                loading: Cell::new(0),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.inner.state
    }

    /// Whether a load evaluator is currently writing a field.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.loading.get() > 0
    }

    /// Install or replace the evaluator for a combination.
    pub fn register_evaluator(&self, trigger: Trigger, operator: Operator, evaluator: Rc<dyn Evaluator>) {
        self.inner
            .evaluators
            .borrow_mut()
            .insert((trigger, operator), evaluator);
    }

    /// Install or replace the connector for a trigger.
    pub fn register_connector(&self, trigger: Trigger, connector: Rc<dyn Connector>) {
        self.inner.connectors.borrow_mut().insert(trigger, connector);
    }

    /// Run every evaluator of `directive` registered under `trigger`.
    pub fn execute(
        &self,
        trigger: Trigger,
        directive: &str,
        value: Option<&Value>,
        field: &Field,
        source: Option<&SourceTag>,
    ) -> Result<(), BinderyError> {
        let parsed = Directive::parse(directive);
        if !parsed.applies_to(trigger) {
            return Ok(());
        }

        let ctx = EvalContext {
            state: &self.inner.state,
            key: &parsed.key,
            value,
            field,
            source,
        };

        let _pass = (trigger == Trigger::Load).then(|| LoadPass::enter(&self.inner.loading));
        for operator in &parsed.operators {
            let evaluator = self.inner.evaluators.borrow().get(&(trigger, *operator)).cloned();
            let Some(evaluator) = evaluator else {
                continue;
            };
            tracing::debug!(%trigger, %operator, key = %parsed.key, "evaluating binding");
            evaluator.evaluate(&ctx)?;
        }

        Ok(())
    }

    /// Run `execute` for each directive in order.
    ///
    /// A failing directive does not stop the rest; the first error is
    /// returned once all have run.
    pub fn execute_all<S: AsRef<str>>(
        &self,
        trigger: Trigger,
        directives: &[S],
        value: Option<&Value>,
        field: &Field,
        source: Option<&SourceTag>,
    ) -> Result<(), BinderyError> {
        let mut first_error = None;
        for directive in directives {
            if let Err(e) = self.execute(trigger, directive.as_ref(), value, field, source) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Wire `directive` so future events under `trigger` call `execute`.
    pub fn connect(
        &self,
        trigger: Trigger,
        directive: &str,
        field: &Field,
        source: Option<SourceTag>,
    ) -> Result<(), BinderyError> {
        let connector = self
            .inner
            .connectors
            .borrow()
            .get(&trigger)
            .cloned()
            .ok_or_else(|| BinderyError::UnknownRelationConnector(trigger.to_string()))?;

        let parsed = Directive::parse(directive);
        connector.connect(self, Rc::from(directive), &parsed.key, field, source);
        Ok(())
    }

    /// Same as [`connect`](Self::connect), with the trigger given by name.
    pub fn connect_named(
        &self,
        trigger: &str,
        directive: &str,
        field: &Field,
        source: Option<SourceTag>,
    ) -> Result<(), BinderyError> {
        self.connect(trigger.parse()?, directive, field, source)
    }

    /// Wire every directive. Callers must not depend on the wiring order.
    pub fn connect_all<S: AsRef<str>>(
        &self,
        trigger: Trigger,
        directives: &[S],
        field: &Field,
        source: Option<SourceTag>,
    ) -> Result<(), BinderyError> {
        for directive in directives {
            self.connect(trigger, directive.as_ref(), field, source.clone())?;
        }
        Ok(())
    }

    /// `execute` from inside an event callback, where errors cannot propagate.
    fn execute_logged(
        &self,
        trigger: Trigger,
        directive: &str,
        value: Option<&Value>,
        field: &Field,
        source: Option<&SourceTag>,
    ) {
        if let Err(e) = self.execute(trigger, directive, value, field, source) {
            tracing::warn!(%trigger, directive, error = %e, "binding failed");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
