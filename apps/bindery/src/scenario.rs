//! # Scenario Runner
//!
//! Drives a headless application from a JSON script. A scenario declares
//! elements, surfaces, modes, views, forms and free-standing bindings, starts
//! the application, then plays its steps in order:
//!
//! ```json
//! {
//!   "elements": [
//!     { "id": "friend", "kind": "input", "name": "friend" },
//!     { "id": "save", "classes": ["save"] },
//!     { "id": "count" }
//!   ],
//!   "bindings": [ { "element": "count", "directives": ["<#friend"] } ],
//!   "forms": {
//!     "friends": {
//!       "elements": ["friend", "save"],
//!       "spec": { "friend": { "state": "friend", "rules": ["emails"] } },
//!       "method": "friend.save"
//!     }
//!   },
//!   "state": { "methods": { "friend.save": ["post", "/friends"] } },
//!   "view": "main",
//!   "views": { "main": {} },
//!   "steps": [
//!     { "step": "type", "element": "friend", "value": "a@b.com" },
//!     { "step": "submit", "form": "friends" },
//!     { "step": "expect", "key": "friend", "value": "a@b.com" }
//!   ]
//! }
//! ```
//!
//! Everything the user would see ends up in the report's transcript.
//! `expect` mismatches are collected as failures; any engine error aborts
//! the run.

use crate::config::AppConfig;
use crate::console::{ConsoleNotifier, ConsoleRenderer, Transcript};
use crate::error::CliError;
use crate::transport::HttpTransport;
use bindery_core::{
    AlertBehavior, Application, ConfirmBehavior, Element, ElementRef, Field, Form, FormHandle,
    FormOptions, FormSpec, Init, MemoryElement, SourceTag, StartOptions, StateMap, SubmitOutcome,
    SurfaceArgs, SurfaceHooks, Trigger, Value, ViewSpec,
};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

// =============================================================================
// SCENARIO DOCUMENT
// =============================================================================

/// A complete scenario file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub elements: Vec<ElementSpec>,
    pub modals: BTreeMap<String, SurfaceSpec>,
    pub interfaces: BTreeMap<String, SurfaceSpec>,
    /// Mode name -> state patch.
    pub modes: BTreeMap<String, StateMap>,
    pub views: BTreeMap<String, ViewSpec>,
    pub forms: BTreeMap<String, FormScript>,
    pub bindings: Vec<BindingSpec>,
    /// Initial state. Mutually exclusive with `bootstrap`.
    pub state: Option<StateMap>,
    /// URL answering `state.load`.
    pub bootstrap: Option<String>,
    /// View shown once started.
    pub view: String,
    pub options: StartOptions,
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse a scenario document.
    pub fn parse(raw: &str) -> Result<Self, CliError> {
        serde_json::from_str(raw).map_err(|e| CliError::Scenario(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKindSpec {
    Input,
    Checkbox,
    #[default]
    Plain,
}

/// One in-memory element.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementSpec {
    pub id: String,
    #[serde(default)]
    pub kind: ElementKindSpec,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    /// Initial value, written before anything is bound.
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorSpec {
    #[default]
    Plain,
    Confirm,
    Alert,
}

/// A modal or interface backed by an element.
#[derive(Debug, Clone, Deserialize)]
pub struct SurfaceSpec {
    pub element: String,
    #[serde(default)]
    pub behavior: BehaviorSpec,
}

/// Live directives bound to one element.
#[derive(Debug, Clone, Deserialize)]
pub struct BindingSpec {
    pub element: String,
    pub directives: Vec<String>,
    /// Restrict wiring to one direction; both when absent.
    #[serde(default)]
    pub trigger: Option<Trigger>,
}

/// Ask a confirm modal before submitting a changed list.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmSpec {
    pub modal: String,
    /// State key holding the previous list.
    pub key: String,
    /// Form field holding the next list; defaults to `key`.
    #[serde(default)]
    pub field: Option<String>,
}

fn yes() -> bool {
    true
}

/// A form and its options.
#[derive(Debug, Clone, Deserialize)]
pub struct FormScript {
    pub elements: Vec<String>,
    #[serde(default)]
    pub spec: FormSpec,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub modal: bool,
    #[serde(default = "yes")]
    pub restore: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub success: Option<String>,
    #[serde(default)]
    pub confirm: Option<ConfirmSpec>,
    /// Mark state clean after a successful submit.
    #[serde(default)]
    pub clean: bool,
}

/// A scripted action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Replace an element's value and raise `change`.
    Type { element: String, value: String },
    Click { element: String },
    Blur { element: String },
    /// Submit a form and wait for the outcome.
    Submit { form: String },
    /// Save or cancel a modal.
    Respond { modal: String, accepted: bool },
    SetState { key: String, value: Value },
    MergeState { key: String, value: Value },
    Mode {
        name: String,
        #[serde(default)]
        remote: bool,
    },
    View {
        name: String,
        #[serde(default)]
        remote: bool,
    },
    ShowModal {
        name: String,
        #[serde(default)]
        args: StateMap,
    },
    ShowInterface {
        name: String,
        #[serde(default)]
        args: StateMap,
    },
    /// Start a confirmation; its answer is logged once the modal responds.
    Confirm {
        modal: String,
        previous: Value,
        next: Value,
    },
    /// Textual modal bridge call.
    Modal {
        method: String,
        #[serde(default)]
        element: Option<String>,
    },
    /// Textual message bridge call.
    Message {
        method: String,
        #[serde(default)]
        text: String,
        #[serde(default)]
        important: bool,
    },
    /// Textual lock bridge call.
    Lock { method: String },
    Reload,
    Dirty,
    Clean,
    /// Let timers and spawned work run.
    Wait { ms: u64 },
    /// Compare a state value.
    Expect { key: String, value: Value },
    /// Compare an element's value.
    ExpectField { element: String, value: Value },
}

// =============================================================================
// REPORT
// =============================================================================

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub state: StateMap,
    pub transcript: Vec<String>,
    pub failures: Vec<String>,
    pub dirty: bool,
    pub unload_warning: Option<String>,
}

impl RunReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

// =============================================================================
// RUNNER
// =============================================================================

/// Builds and drives one application per scenario.
///
/// `run` spawns local tasks, so it must be awaited inside a `LocalSet`.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    config: AppConfig,
    echo: bool,
}

struct Stage {
    app: Application,
    transcript: Transcript,
    elements: BTreeMap<String, Rc<MemoryElement>>,
    forms: BTreeMap<String, FormHandle>,
    failures: Vec<String>,
}

impl ScenarioRunner {
    #[must_use]
    pub fn new(config: AppConfig, echo: bool) -> Self {
        Self { config, echo }
    }

    pub async fn run(&self, scenario: Scenario) -> Result<RunReport, CliError> {
        let mut stage = self.build(&scenario)?;

        let init = match (scenario.state, scenario.bootstrap) {
            (Some(_), Some(_)) => {
                return Err(CliError::Scenario(
                    "state and bootstrap are mutually exclusive".into(),
                ));
            }
            (Some(state), None) => Init::State(state),
            (None, Some(url)) => Init::Bootstrap(url),
            (None, None) => Init::State(StateMap::new()),
        };

        tracing::info!(view = %scenario.view, steps = scenario.steps.len(), "starting scenario");
        stage.app.start(init, &scenario.view, scenario.options).await?;

        for (index, step) in scenario.steps.into_iter().enumerate() {
            tracing::debug!(index, ?step, "scenario step");
            stage.play(index, step).await?;
        }

        Ok(RunReport {
            state: stage.app.state().snapshot(),
            transcript: stage.transcript.lines(),
            failures: stage.failures,
            dirty: stage.app.is_dirty(),
            unload_warning: stage.app.unload_warning(),
        })
    }

    fn build(&self, scenario: &Scenario) -> Result<Stage, CliError> {
        let settings = self.config.settings.clone();
        let separators = settings.separators.clone();
        let transcript = Transcript::new(self.echo);
        let app = Application::new(settings);
        app.install_renderer(Rc::new(ConsoleRenderer::new(transcript.clone())));
        app.install_notifier(Rc::new(ConsoleNotifier::new(transcript.clone(), app.settings())));
        app.install_transport(Rc::new(HttpTransport::new(&self.config.transport)?));

        let mut elements = BTreeMap::new();
        for spec in &scenario.elements {
            let element = build_element(spec);
            if let Some(value) = &spec.value {
                Field::bind(element.clone()).set_value(value, &separators);
            }
            if elements.insert(spec.id.clone(), element).is_some() {
                return Err(CliError::Scenario(format!("duplicate element id {}", spec.id)));
            }
        }

        let mut stage = Stage {
            app,
            transcript,
            elements,
            forms: BTreeMap::new(),
            failures: Vec::new(),
        };

        for (name, surface) in &scenario.modals {
            let element = stage.element_ref(&surface.element)?;
            match surface.behavior {
                BehaviorSpec::Plain => stage.app.define_modal(name, element, SurfaceHooks::new()),
                BehaviorSpec::Confirm => stage.app.define_confirm_modal(name, element),
                BehaviorSpec::Alert => stage.app.define_alert_modal(name, element),
            }
        }
        for (name, surface) in &scenario.interfaces {
            let element = stage.element_ref(&surface.element)?;
            match surface.behavior {
                BehaviorSpec::Plain => stage.app.define_interface(name, element, SurfaceHooks::new()),
                BehaviorSpec::Confirm => {
                    stage.app.define_interface(name, element, ConfirmBehavior::default());
                }
                BehaviorSpec::Alert => {
                    stage.app.define_interface(name, element, AlertBehavior::default());
                }
            }
        }

        for (name, patch) in &scenario.modes {
            stage.app.define_mode(name, patch.clone(), None);
        }
        for (name, view) in &scenario.views {
            stage.app.define_view(name, view.clone(), None);
        }

        for binding in &scenario.bindings {
            let field = Field::bind(stage.element_ref(&binding.element)?);
            let tag = SourceTag::unique("binding");
            let triggers = match binding.trigger {
                Some(trigger) => vec![trigger],
                None => Trigger::BOTH.to_vec(),
            };
            for trigger in triggers {
                stage.app.relations().connect_all(
                    trigger,
                    binding.directives.as_slice(),
                    &field,
                    Some(tag.clone()),
                )?;
            }
        }

        for (name, script) in &scenario.forms {
            let handle = stage.define_form(script)?;
            stage.forms.insert(name.clone(), handle);
        }

        Ok(stage)
    }
}

fn build_element(spec: &ElementSpec) -> Rc<MemoryElement> {
    let mut element = match (spec.kind, &spec.name) {
        (ElementKindSpec::Input, Some(name)) => MemoryElement::input(name.as_str()),
        (ElementKindSpec::Checkbox, Some(name)) => MemoryElement::checkbox(name.as_str()),
        (ElementKindSpec::Input, None) => MemoryElement::input(spec.id.as_str()),
        (ElementKindSpec::Checkbox, None) => MemoryElement::checkbox(spec.id.as_str()),
        (ElementKindSpec::Plain, name) => {
            let plain = MemoryElement::plain();
            match name {
                Some(name) => plain.with_name(name.as_str()),
                None => plain,
            }
        }
    };
    element = element.with_id(spec.id.as_str());
    for class in &spec.classes {
        element = element.with_class(class.as_str());
    }
    element.shared()
}

fn describe(outcome: &SubmitOutcome) -> String {
    match outcome {
        SubmitOutcome::Invalid(names) => format!("invalid ({})", names.join(", ")),
        SubmitOutcome::Rejected => "rejected".into(),
        SubmitOutcome::Submitted(_) => "submitted".into(),
        SubmitOutcome::Failed(e) => format!("failed: {e}"),
        SubmitOutcome::Native(_) => "native".into(),
    }
}

impl Stage {
    fn element(&self, id: &str) -> Result<Rc<MemoryElement>, CliError> {
        self.elements
            .get(id)
            .cloned()
            .ok_or_else(|| CliError::Scenario(format!("unknown element {id}")))
    }

    fn element_ref(&self, id: &str) -> Result<ElementRef, CliError> {
        Ok(self.element(id)?)
    }

    fn define_form(&self, script: &FormScript) -> Result<FormHandle, CliError> {
        let elements = script
            .elements
            .iter()
            .map(|id| self.element_ref(id))
            .collect::<Result<Vec<_>, _>>()?;
        let form = Form::new(elements);

        let mut options = FormOptions {
            modal: script.modal,
            restore: script.restore,
            method: script.method.clone(),
            error: script.error.clone(),
            ..FormOptions::default()
        };
        options.remote.success = script.success.clone();

        if let Some(confirm) = script.confirm.clone() {
            options = options.inject(move |app, data| {
                let app = app.clone();
                let confirm = confirm.clone();
                async move {
                    let previous = app.state().get_state(&confirm.key, Value::Null);
                    let field = confirm.field.as_deref().unwrap_or(&confirm.key);
                    let next = data.get(field).cloned().unwrap_or(Value::Null);
                    match app.confirm(&confirm.modal, previous, next).await {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "confirmation failed");
                            false
                        }
                    }
                }
                .boxed_local()
            });
        }
        if script.clean {
            options = options.on_success(|app, _| app.clean_state());
        }

        Ok(self.app.define_form(&form, &script.spec, options)?)
    }

    async fn play(&mut self, index: usize, step: Step) -> Result<(), CliError> {
        let app = self.app.clone();
        let separators = app.settings().separators.clone();

        match step {
            Step::Type { element, value } => self.element(&element)?.type_text(&value),
            Step::Click { element } => self.element(&element)?.click(),
            Step::Blur { element } => {
                self.element(&element)?.trigger(bindery_core::EventKind::Blur);
            }
            Step::Submit { form } => {
                let handle = self
                    .forms
                    .get(&form)
                    .cloned()
                    .ok_or_else(|| CliError::Scenario(format!("unknown form {form}")))?;
                let outcome = handle.submit().await?;
                self.transcript
                    .push(format!("submit {form}: {}", describe(&outcome)));
            }
            Step::Respond { modal, accepted } => {
                app.respond_modal(&modal, accepted)?;
            }
            Step::SetState { key, value } => {
                app.state().set_state(&key, value, None);
            }
            Step::MergeState { key, value } => app.state().merge_state(&key, value, None),
            Step::Mode { name, remote } => app.set_mode(&name, remote).await?,
            Step::View { name, remote } => app.show_view(&name, remote).await?,
            Step::ShowModal { name, args } => {
                app.show_modal(&name, &surface_args(args))?;
            }
            Step::ShowInterface { name, args } => {
                app.show_interface(&name, &surface_args(args))?;
            }
            Step::Confirm {
                modal,
                previous,
                next,
            } => {
                let transcript = self.transcript.clone();
                tokio::task::spawn_local(async move {
                    match app.confirm(&modal, previous, next).await {
                        Ok(accepted) => transcript.push(format!("confirm {modal}: {accepted}")),
                        Err(e) => transcript.push(format!("confirm {modal}: {e}")),
                    }
                });
                tokio::task::yield_now().await;
            }
            Step::Modal { method, element } => {
                let element = element.map(|id| self.element_ref(&id)).transpose()?;
                app.external().modal(&method, element.as_ref())?;
            }
            Step::Message {
                method,
                text,
                important,
            } => app.external().message(&method, &text, important).await?,
            Step::Lock { method } => app.external().lock(&method).await?,
            Step::Reload => {
                let outcome = app.reload_state().await?;
                self.transcript.push(format!("reload: {outcome}"));
            }
            Step::Dirty => app.dirty_state(),
            Step::Clean => app.clean_state(),
            Step::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
            Step::Expect { key, value } => {
                let actual = app.state().get(&key).unwrap_or(Value::Null);
                if actual != value {
                    self.failures.push(format!(
                        "step {index}: state {key} is {actual}, expected {value}"
                    ));
                }
            }
            Step::ExpectField { element, value } => {
                let actual = Field::bind(self.element_ref(&element)?).value();
                // lists compare against their displayed text
                let expected = match value {
                    Value::Array(_) => Value::String(bindery_core::value_text(&value, &separators)),
                    other => other,
                };
                if actual != expected {
                    self.failures.push(format!(
                        "step {index}: element {element} is {actual}, expected {expected}"
                    ));
                }
            }
        }
        Ok(())
    }
}

fn surface_args(args: StateMap) -> SurfaceArgs {
    args.into_iter()
        .fold(SurfaceArgs::new(), |acc, (key, value)| acc.with(&key, value))
}

// =============================================================================
// TESTS
// =============================================================================
