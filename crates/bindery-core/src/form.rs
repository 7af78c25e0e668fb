//! # Form Binder
//!
//! Synchronises a group of elements with state and drives the submission
//! lifecycle.
//!
//! ## Binding
//!
//! A form spec maps a field key to validation rules and state directives:
//!
//! ```json
//! { "friend": { "state": ["friend"], "rules": ["email"] },
//!   "$.friend-lbl": { "state": "<friend" } }
//! ```
//!
//! Keys are field names, or `$` followed by a selector (`.class`, `#id`,
//! `[name=x]`). Live bindings are load-only (state to form); the form pushes
//! into state only on a successful submit.
//!
//! ## Submission
//!
//! 1. every rule table entry is validated; failures mark the fields bad,
//!    show the form error and stop
//! 2. the optional `inject` hook may veto (the form is then restored)
//! 3. with a `method`, the data goes through the remote dispatcher;
//!    otherwise the host performs a native submission
//! 4. on success the declared keys are saved, modals are hidden when the
//!    `modal` option is set, then the caller's `on_success` runs
//!
//! Clicking the save action disables it for [`SUBMIT_COOLDOWN`].

use crate::application::Application;
use crate::directive::Trigger;
use crate::element::{self, ElementRef, EventKind};
use crate::field::Field;
use crate::lists::ensure_array;
use crate::primitives::{DEFAULT_FORM_ERROR, SELECTOR_MARKER, SUBMIT_COOLDOWN};
use crate::remote::{RemoteOptions, RemoteOutcome};
use crate::types::{BinderyError, SourceTag, StateMap, Value};
use crate::validation::RuleTable;
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;

// =============================================================================
// FORM
// =============================================================================

struct FormInner {
    tag: SourceTag,
    elements: Vec<ElementRef>,
}

/// A group of elements bound together. Its tag is the source of every state
/// write it performs.
#[derive(Clone)]
pub struct Form {
    inner: Rc<FormInner>,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("tag", &self.inner.tag)
            .field("names", &self.names())
            .finish()
    }
}

impl Form {
    #[must_use]
    pub fn new(elements: Vec<ElementRef>) -> Self {
        Self {
            inner: Rc::new(FormInner {
                tag: SourceTag::unique("form"),
                elements,
            }),
        }
    }

    #[must_use]
    pub fn tag(&self) -> &SourceTag {
        &self.inner.tag
    }

    #[must_use]
    pub fn elements(&self) -> &[ElementRef] {
        &self.inner.elements
    }

    /// Elements matching `selector`, in form order.
    #[must_use]
    pub fn find(&self, selector: &str) -> Vec<ElementRef> {
        self.inner
            .elements
            .iter()
            .filter(|&e| element::matches(e.as_ref(), selector))
            .cloned()
            .collect()
    }

    /// Every element carrying a name.
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        self.inner
            .elements
            .iter()
            .filter(|e| e.name().is_some())
            .cloned()
            .map(Field::bind)
            .collect()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.inner.elements.iter().filter_map(|e| e.name()).collect()
    }

    /// Current values of every named field.
    #[must_use]
    pub fn data(&self) -> StateMap {
        self.fields()
            .into_iter()
            .filter_map(|f| f.name().map(|name| (name, f.value())))
            .collect()
    }

    /// Resolve a spec key: `$selector` or a field name.
    #[must_use]
    pub fn find_field(&self, key: &str) -> Option<Field> {
        if key.is_empty() {
            return None;
        }
        let selector = match key.strip_prefix(SELECTOR_MARKER) {
            Some(selector) => selector.to_string(),
            None => format!("[name={key}]"),
        };
        self.find(&selector).into_iter().next().map(Field::bind)
    }
}

// =============================================================================
// SPECS AND OPTIONS
// =============================================================================

/// Field key -> state directives.
pub type StateSpec = BTreeMap<String, Vec<String>>;

/// Per-field entry of a form spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    pub rules: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub state: Vec<String>,
}

/// Field key -> rules and directives.
pub type FormSpec = BTreeMap<String, FieldSpec>;

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    ensure_array(value)
        .into_iter()
        .map(|v| match v {
            Value::String(s) => Ok(s),
            other => Err(serde::de::Error::custom(format!("directive must be a string, got {other}"))),
        })
        .collect()
}

/// Asynchronous veto run after validation, given the form data.
pub type InjectHook = Rc<dyn Fn(&Application, StateMap) -> LocalBoxFuture<'static, bool>>;

/// Options of [`Application::define_form`].
#[derive(Clone)]
pub struct FormOptions {
    /// Hide all modals after a successful submit.
    pub modal: bool,
    /// Reload the form from state on cancel or rejected injection.
    pub restore: bool,
    /// Logical remote method; `None` means native submission.
    pub method: Option<String>,
    /// Runs before any binding is wired.
    pub init: Option<Rc<dyn Fn(&Form)>>,
    /// Message shown when validation fails.
    pub error: Option<String>,
    pub inject: Option<InjectHook>,
    pub on_success: Option<Rc<dyn Fn(&Application, &Value)>>,
    pub on_failure: Option<Rc<dyn Fn(&Application)>>,
    /// Messages and lock behaviour of the remote call.
    pub remote: RemoteOptions,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            modal: false,
            restore: true,
            method: None,
            init: None,
            error: None,
            inject: None,
            on_success: None,
            on_failure: None,
            remote: RemoteOptions::default(),
        }
    }
}

impl FormOptions {
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn modal(mut self) -> Self {
        self.modal = true;
        self
    }

    #[must_use]
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    #[must_use]
    pub fn on_success(mut self, f: impl Fn(&Application, &Value) + 'static) -> Self {
        self.on_success = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn on_failure(mut self, f: impl Fn(&Application) + 'static) -> Self {
        self.on_failure = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn inject(
        mut self,
        f: impl Fn(&Application, StateMap) -> LocalBoxFuture<'static, bool> + 'static,
    ) -> Self {
        self.inject = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn init(mut self, f: impl Fn(&Form) + 'static) -> Self {
        self.init = Some(Rc::new(f));
        self
    }
}

/// How a submission ended.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Validation failed for these field names.
    Invalid(Vec<String>),
    /// The inject hook vetoed the submission.
    Rejected,
    /// The remote call succeeded with this response.
    Submitted(Value),
    /// The remote call failed; the user has been told.
    Failed(BinderyError),
    /// Valid data ready for a native submission by the host.
    Native(StateMap),
}

// =============================================================================
// FORM STATE
// =============================================================================

impl Application {
    pub fn form_data(&self, form: &Form) -> StateMap {
        form.data()
    }

    pub fn form_fields(&self, form: &Form) -> Vec<Field> {
        form.fields()
    }

    pub fn form_names(&self, form: &Form) -> Vec<String> {
        form.names()
    }

    pub fn find_field(&self, form: &Form, key: &str) -> Option<Field> {
        form.find_field(key)
    }

    /// Wire live state-to-form bindings. `both` is not supported.
    pub fn connect_form_state(&self, form: &Form, spec: &StateSpec, both: bool) -> Result<(), BinderyError> {
        if both {
            return Err(BinderyError::NotImplemented("bidirectional form connection"));
        }
        for (key, directives) in spec {
            let Some(field) = self.bound_field(form, key) else {
                continue;
            };
            self.relations()
                .connect_all(Trigger::Load, directives.as_slice(), &field, Some(form.tag().clone()))?;
        }
        Ok(())
    }

    /// Push every declared field into state once.
    pub fn save_form_state(&self, form: &Form, spec: &StateSpec) -> Result<(), BinderyError> {
        for (key, directives) in spec {
            let Some(field) = self.bound_field(form, key) else {
                continue;
            };
            let value = field.value();
            self.relations()
                .execute_all(Trigger::Save, directives.as_slice(), Some(&value), &field, Some(form.tag()))?;
        }
        Ok(())
    }

    /// Pull every declared field from state once.
    pub fn load_form_state(&self, form: &Form, spec: &StateSpec) -> Result<(), BinderyError> {
        for (key, directives) in spec {
            let Some(field) = self.bound_field(form, key) else {
                continue;
            };
            self.relations()
                .execute_all(Trigger::Load, directives.as_slice(), None, &field, None)?;
        }
        Ok(())
    }

    fn bound_field(&self, form: &Form, key: &str) -> Option<Field> {
        let field = form.find_field(key);
        if field.is_none() {
            tracing::warn!(form = %form.tag(), key, "no field matches form spec key");
        }
        field
    }

    // =========================================================================
    // DEFINE FORM
    // =========================================================================

    /// Bind `form` according to `spec` and instrument its actions.
    ///
    /// # Panics
    ///
    /// Clicking the save action spawns the cool-down and the submission with
    /// `tokio::task::spawn_local`, which panics when the click is raised
    /// outside a `LocalSet`.
    pub fn define_form(&self, form: &Form, spec: &FormSpec, options: FormOptions) -> Result<FormHandle, BinderyError> {
        let rules: RuleTable = spec
            .iter()
            .filter(|(_, s)| !s.rules.is_empty())
            .map(|(k, s)| (k.clone(), s.rules.clone()))
            .collect();
        let state: StateSpec = spec
            .iter()
            .filter(|(_, s)| !s.state.is_empty())
            .map(|(k, s)| (k.clone(), s.state.clone()))
            .collect();

        if let Some(init) = &options.init {
            init(form);
        }

        self.connect_form_state(form, &state, false)?;

        let handle = FormHandle {
            app: self.clone(),
            form: form.clone(),
            rules: Rc::new(rules),
            state: Rc::new(state),
            options: Rc::new(options),
        };
        handle.instrument();
        Ok(handle)
    }
}

// =============================================================================
// FORM HANDLE
// =============================================================================

/// A defined form.
#[derive(Clone)]
pub struct FormHandle {
    app: Application,
    form: Form,
    rules: Rc<RuleTable>,
    state: Rc<StateSpec>,
    options: Rc<FormOptions>,
}

impl std::fmt::Debug for FormHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormHandle")
            .field("form", &self.form)
            .field("rules", &self.rules)
            .field("state", &self.state)
            .field("method", &self.options.method)
            .finish()
    }
}

impl FormHandle {
    #[must_use]
    pub fn form(&self) -> &Form {
        &self.form
    }

    #[must_use]
    pub fn state_spec(&self) -> &StateSpec {
        &self.state
    }

    /// Validate, optionally confirm through `inject`, then submit.
    pub async fn submit(&self) -> Result<SubmitOutcome, BinderyError> {
        let data = self.form.data();
        let invalid = self.app.validator().validate_all(&self.rules, &data);
        let classes = &self.app.settings().validation;

        if !invalid.is_empty() {
            for name in &invalid {
                for element in self.form.find(&format!("[name={name}]")) {
                    element.remove_class(&classes.good);
                    element.add_class(&classes.bad);
                }
            }
            let text = self.options.error.as_deref().unwrap_or(DEFAULT_FORM_ERROR);
            self.app.external().notifier()?.show_error(text);
            tracing::debug!(form = %self.form.tag(), ?invalid, "form rejected by validation");
            return Ok(SubmitOutcome::Invalid(invalid));
        }

        for element in self.form.find(&format!(".{}", classes.bad)) {
            element.remove_class(&classes.bad);
            element.remove_class(&classes.good);
        }

        if let Some(inject) = &self.options.inject
            && !inject(&self.app, data.clone()).await
        {
            self.restore()?;
            return Ok(SubmitOutcome::Rejected);
        }

        let Some(method) = &self.options.method else {
            self.succeed(&Value::Object(data.clone()))?;
            return Ok(SubmitOutcome::Native(data));
        };

        match self
            .app
            .remote_call(method, &Value::Object(data), &self.options.remote)
            .await?
        {
            RemoteOutcome::Success(response) => {
                self.succeed(&response)?;
                Ok(SubmitOutcome::Submitted(response))
            }
            RemoteOutcome::Failure(error) => {
                if let Some(on_failure) = &self.options.on_failure {
                    on_failure(&self.app);
                }
                Ok(SubmitOutcome::Failed(error))
            }
        }
    }

    /// Reload the form from state, when the `restore` option is set.
    pub fn restore(&self) -> Result<(), BinderyError> {
        if self.options.restore {
            self.app.load_form_state(&self.form, &self.state)?;
        }
        Ok(())
    }

    /// Check a single named field and mark it good or bad.
    pub fn validate_field(&self, field: &Field) -> bool {
        let Some(name) = field.name() else {
            return true;
        };
        let rules = self.rules.get(&name).map(Vec::as_slice).unwrap_or_default();
        let ok = self
            .app
            .validator()
            .validate(&field.value(), rules, &self.form.data());

        let classes = &self.app.settings().validation;
        let (remove, add) = if ok {
            (&classes.bad, &classes.good)
        } else {
            (&classes.good, &classes.bad)
        };
        field.element().remove_class(remove);
        field.element().add_class(add);
        ok
    }

    fn succeed(&self, response: &Value) -> Result<(), BinderyError> {
        self.app.save_form_state(&self.form, &self.state)?;
        if self.options.modal {
            self.app.hide_modals()?;
        }
        if let Some(on_success) = &self.options.on_success {
            on_success(&self.app, response);
        }
        Ok(())
    }

    fn instrument(&self) {
        let actions = &self.app.settings().actions;

        for button in self.form.find(&format!(".{}", actions.cancel)) {
            let handle = self.clone();
            button.listen(
                EventKind::Click,
                Rc::new(move || {
                    if let Err(e) = handle.restore() {
                        tracing::warn!(error = %e, "restoring form failed");
                    }
                }),
            );
        }

        for button in self.form.find(&format!(".{}", actions.save)) {
            let handle = self.clone();
            let target = Rc::clone(&button);
            button.listen(
                EventKind::Click,
                Rc::new(move || {
                    if target.is_disabled() {
                        return;
                    }
                    target.set_disabled(true);
                    let cooled = Rc::clone(&target);
                    tokio::task::spawn_local(async move {
                        tokio::time::sleep(SUBMIT_COOLDOWN).await;
                        cooled.set_disabled(false);
                    });

                    let handle = handle.clone();
                    tokio::task::spawn_local(async move {
                        match handle.submit().await {
                            Ok(outcome) => tracing::debug!(?outcome, "form submitted"),
                            Err(e) => tracing::warn!(error = %e, "form submission failed"),
                        }
                    });
                }),
            );
        }

        for field in self.form.fields() {
            let handle = self.clone();
            let blurred = field.clone();
            field.element().listen(
                EventKind::Blur,
                Rc::new(move || {
                    handle.validate_field(&blurred);
                }),
            );
        }
    }
}
