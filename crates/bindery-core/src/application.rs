//! # Application
//!
//! The root object. It owns one instance of every engine component and is
//! the context handed to mode logic, surface hooks and form callbacks.
//!
//! `Application` is a cheap-to-clone handle. Everything asynchronous it
//! starts (submit cool-downs, polls, modal transitions) is spawned with
//! `tokio::task::spawn_local`, so hosts drive it from a `LocalSet`.

use crate::element::ElementRef;
use crate::external::{External, Notifier, SurfaceRenderer};
use crate::mode::ModeEngine;
use crate::offline::{DebugConfig, OfflineTransport};
use crate::primitives::{MODAL_SWAP_DELAY, METHODS_KEY, STATE_LOAD_METHOD, WILDCARD_KEY};
use crate::relation::RelationEngine;
use crate::remote::{
    DebugMode, MethodTable, RemoteDispatcher, RemoteOptions, RemoteOutcome, Transport, Verb,
};
use crate::settings::Settings;
use crate::state::StateStore;
use crate::surface::{
    AlertBehavior, ConfirmBehavior, Resume, SurfaceArgs, SurfaceBehavior, SurfaceRegistry,
};
use crate::types::{BinderyError, StateMap, SurfaceKind, Value};
use crate::validation::Validator;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::JoinHandle;

// =============================================================================
// START OPTIONS
// =============================================================================

/// What `start` seeds the state with.
#[derive(Debug, Clone, PartialEq)]
pub enum Init {
    /// Initial state, written directly.
    State(StateMap),
    /// URL answering `state.load`; the full state is fetched from it.
    Bootstrap(String),
}

impl From<StateMap> for Init {
    fn from(state: StateMap) -> Self {
        Self::State(state)
    }
}

impl From<&str> for Init {
    fn from(url: &str) -> Self {
        Self::Bootstrap(url.to_string())
    }
}

/// Result of a `state.load` round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The response was written into state.
    Applied,
    /// A newer reload was issued meanwhile; this response was dropped.
    Superseded,
    /// The remote call failed.
    Failed,
}

impl std::fmt::Display for ReloadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Applied => f.write_str("ok"),
            Self::Superseded => f.write_str("superseded"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Options recognised by `start`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartOptions {
    /// Enable debug mode (offline transport when `offline` is set).
    pub debug: Option<DebugConfig>,
    /// Guard against leaving with unsaved changes.
    pub warn: bool,
    /// Keep state in sync by polling `state.load`.
    pub live: bool,
}

// =============================================================================
// APPLICATION
// =============================================================================

struct AppInner {
    settings: Rc<Settings>,
    state: StateStore,
    relations: RelationEngine,
    validator: Validator,
    external: External,
    modals: SurfaceRegistry,
    interfaces: SurfaceRegistry,
    modes: ModeEngine,
    remote: RemoteDispatcher,
    warn: Cell<bool>,
    state_logging: Cell<bool>,
    reload_generation: Cell<u64>,
    live: RefCell<Option<JoinHandle<()>>>,
}

/// Handle to a running application.
#[derive(Clone)]
pub struct Application {
    inner: Rc<AppInner>,
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("state", &self.inner.state)
            .field("modals", &self.inner.modals)
            .field("interfaces", &self.inner.interfaces)
            .field("modes", &self.inner.modes)
            .field("debug", &self.inner.remote.debug_mode())
            .finish()
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Application {
    /// Create an application with no capabilities installed.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let settings = Rc::new(settings);
        let state = StateStore::with_separators(settings.separators.clone());
        let external = External::new();

        Self {
            inner: Rc::new(AppInner {
                relations: RelationEngine::new(state.clone()),
                validator: Validator::new(settings.separators.clone()),
                modals: SurfaceRegistry::new(SurfaceKind::Modal, external.clone(), Rc::clone(&settings)),
                interfaces: SurfaceRegistry::new(
                    SurfaceKind::Interface,
                    external.clone(),
                    Rc::clone(&settings),
                ),
                modes: ModeEngine::default(),
                remote: RemoteDispatcher::new(state.clone(), external.clone(), settings.network.clone()),
                warn: Cell::new(false),
                state_logging: Cell::new(false),
                reload_generation: Cell::new(0),
                live: RefCell::new(None),
                settings,
                state,
                external,
            }),
        }
    }

    // =========================================================================
    // COMPONENTS
    // =========================================================================

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Look up a setting by dotted path.
    pub fn opt(&self, path: &str) -> Result<Value, BinderyError> {
        self.inner.settings.opt(path)
    }

    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.inner.state
    }

    #[must_use]
    pub fn relations(&self) -> &RelationEngine {
        &self.inner.relations
    }

    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.inner.validator
    }

    #[must_use]
    pub fn external(&self) -> &External {
        &self.inner.external
    }

    #[must_use]
    pub fn modals(&self) -> &SurfaceRegistry {
        &self.inner.modals
    }

    #[must_use]
    pub fn interfaces(&self) -> &SurfaceRegistry {
        &self.inner.interfaces
    }

    #[must_use]
    pub fn modes(&self) -> &ModeEngine {
        &self.inner.modes
    }

    #[must_use]
    pub fn remote(&self) -> &RemoteDispatcher {
        &self.inner.remote
    }

    pub fn install_renderer(&self, renderer: Rc<dyn SurfaceRenderer>) {
        self.inner.external.install_renderer(renderer);
    }

    pub fn install_notifier(&self, notifier: Rc<dyn Notifier>) {
        self.inner.external.install_notifier(notifier);
    }

    pub fn install_transport(&self, transport: Rc<dyn Transport>) {
        self.inner.external.install_transport(transport);
    }

    // =========================================================================
    // DIRTY STATE
    // =========================================================================

    pub fn dirty_state(&self) {
        self.inner.state.mark_dirty();
    }

    pub fn clean_state(&self) {
        self.inner.state.mark_clean();
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.state.is_dirty()
    }

    /// Text the host should show before unloading, if any.
    ///
    /// `None` unless the `warn` start option is set and state is dirty.
    #[must_use]
    pub fn unload_warning(&self) -> Option<String> {
        (self.inner.warn.get() && self.is_dirty()).then(|| self.inner.settings.states.unsaved.clone())
    }

    // =========================================================================
    // DEBUG
    // =========================================================================

    /// Switch debug mode on.
    ///
    /// With `offline` responses the installed transport is replaced by an
    /// [`OfflineTransport`]. The `testing` patch is applied immediately.
    pub fn enable_debug(&self, config: DebugConfig) {
        let mode = if config.offline.is_some() {
            DebugMode::Offline
        } else {
            DebugMode::Debug
        };
        self.inner.remote.set_debug_mode(mode);
        tracing::info!(?mode, "debug mode enabled");

        if !self.inner.state_logging.replace(true) {
            self.inner.state.bind_state([WILDCARD_KEY], |key, value, source| {
                tracing::debug!(
                    key,
                    %value,
                    source = ?source.map(|s| s.as_str()),
                    "state changed"
                );
            });
        }

        if let Some(testing) = &config.testing {
            self.inner.state.set_state_bulk(testing, None);
        }

        if let Some(responses) = config.offline {
            let transport = OfflineTransport::new(
                responses,
                Duration::from_millis(config.latency_ms),
                self.inner.state.clone(),
            );
            self.inner.external.install_transport(Rc::new(transport));
        }
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.inner.remote.debug_mode() != DebugMode::Off
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.inner.remote.debug_mode() == DebugMode::Offline
    }

    // =========================================================================
    // REMOTE
    // =========================================================================

    pub async fn remote_call(
        &self,
        method: &str,
        data: &Value,
        options: &RemoteOptions,
    ) -> Result<RemoteOutcome, BinderyError> {
        self.inner.remote.remote_call(method, data, options).await
    }

    pub fn remote_poll(
        &self,
        method: &str,
        data: &Value,
        on_each: impl Fn(Value) + 'static,
    ) -> Result<JoinHandle<()>, BinderyError> {
        self.inner.remote.remote_poll(method, data, on_each)
    }

    /// Fetch the full state through `state.load` and apply it.
    ///
    /// Returns whether the reload succeeded. When reloads overlap, only the
    /// most recently issued one writes its result.
    pub async fn reload_state(&self) -> Result<ReloadOutcome, BinderyError> {
        let generation = self.inner.reload_generation.get() + 1;
        self.inner.reload_generation.set(generation);

        let outcome = self
            .remote_call(STATE_LOAD_METHOD, &Value::Object(StateMap::new()), &RemoteOptions::silent())
            .await?;

        match outcome {
            RemoteOutcome::Success(value) => {
                if generation != self.inner.reload_generation.get() {
                    tracing::debug!(generation, "discarding stale state reload");
                    return Ok(ReloadOutcome::Superseded);
                }
                apply_state(&self.inner.state, value);
                Ok(ReloadOutcome::Applied)
            }
            RemoteOutcome::Failure(error) => {
                tracing::warn!(error = %error, "state reload failed");
                Ok(ReloadOutcome::Failed)
            }
        }
    }

    /// Poll `state.load` and apply every response.
    pub fn live_state(&self) -> Result<(), BinderyError> {
        let state = self.inner.state.clone();
        let handle = self.remote_poll(STATE_LOAD_METHOD, &Value::Object(StateMap::new()), move |value| {
            apply_state(&state, value);
        })?;
        if let Some(previous) = self.inner.live.borrow_mut().replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    // =========================================================================
    // MODALS
    // =========================================================================

    pub fn define_modal(&self, name: &str, element: ElementRef, behavior: impl SurfaceBehavior + 'static) {
        self.inner.modals.define(name, element, behavior);
    }

    /// A modal confirming a change between two string lists.
    pub fn define_confirm_modal(&self, name: &str, element: ElementRef) {
        self.inner.modals.define(name, element, ConfirmBehavior::default());
    }

    /// A modal showing a title and a message.
    pub fn define_alert_modal(&self, name: &str, element: ElementRef) {
        self.inner.modals.define(name, element, AlertBehavior::default());
    }

    #[must_use]
    pub fn get_modal(&self, name: &str) -> Option<ElementRef> {
        self.inner.modals.element(name)
    }

    pub fn show_modal(&self, name: &str, args: &SurfaceArgs) -> Result<bool, BinderyError> {
        self.inner.modals.show(name, args)
    }

    pub fn hide_modals(&self) -> Result<(), BinderyError> {
        self.inner.modals.hide_all()
    }

    pub fn prepare_modals(&self) -> Result<(), BinderyError> {
        self.inner.modals.prepare_all()
    }

    /// Hide modals, wait for the transition, then show `name`.
    pub async fn swap_modal(&self, name: &str, args: SurfaceArgs) -> Result<bool, BinderyError> {
        self.hide_modals()?;
        tokio::time::sleep(MODAL_SWAP_DELAY).await;
        self.show_modal(name, &args)
    }

    /// Save (`true`) or cancel (`false`) the modal `name`, then hide modals.
    pub fn respond_modal(&self, name: &str, accepted: bool) -> Result<bool, BinderyError> {
        let resumed = self.inner.modals.respond(name, accepted)?;
        self.hide_modals()?;
        Ok(resumed)
    }

    /// Ask the confirm modal `name` to approve the change from `previous` to
    /// `next`. Resolves `true` at once when nothing changed.
    pub async fn confirm(&self, name: &str, previous: Value, next: Value) -> Result<bool, BinderyError> {
        let (resume, answer) = Resume::channel();
        {
            let args = SurfaceArgs::new()
                .with("previous", previous)
                .with("next", next)
                .with_resume(resume);
            self.show_modal(name, &args)?;
        }
        Ok(answer.await.unwrap_or(false))
    }

    /// Show the alert modal `name` and wait until it is dismissed.
    pub async fn alert(&self, name: &str, title: &str, message: &str) -> Result<(), BinderyError> {
        let (resume, dismissed) = Resume::channel();
        {
            let args = SurfaceArgs::new()
                .with("title", Value::from(title))
                .with("message", Value::from(message))
                .with_resume(resume);
            self.show_modal(name, &args)?;
        }
        if dismissed.await.is_err() {
            tracing::debug!(modal = name, "alert closed without response");
        }
        Ok(())
    }

    // =========================================================================
    // INTERFACES
    // =========================================================================

    pub fn define_interface(&self, name: &str, element: ElementRef, behavior: impl SurfaceBehavior + 'static) {
        self.inner.interfaces.define(name, element, behavior);
    }

    #[must_use]
    pub fn get_interface(&self, name: &str) -> Option<ElementRef> {
        self.inner.interfaces.element(name)
    }

    pub fn show_interface(&self, name: &str, args: &SurfaceArgs) -> Result<bool, BinderyError> {
        self.inner.interfaces.show(name, args)
    }

    pub fn hide_interfaces(&self) -> Result<(), BinderyError> {
        self.inner.interfaces.hide_all()
    }

    pub fn prepare_interfaces(&self) -> Result<(), BinderyError> {
        self.inner.interfaces.prepare_all()
    }

    // =========================================================================
    // BOOTSTRAP
    // =========================================================================

    /// Start the application.
    ///
    /// 1. surfaces are prepared (interfaces, then modals)
    /// 2. state is seeded, or bootstrapped from a URL through `state.load`
    /// 3. debug mode and live polling are enabled if requested
    /// 4. `view` is shown
    pub async fn start(&self, init: impl Into<Init>, view: &str, options: StartOptions) -> Result<(), BinderyError> {
        if options.warn {
            self.inner.warn.set(true);
        }

        self.prepare_views()?;

        match init.into() {
            Init::State(state) => self.inner.state.set_state_bulk(&state, None),
            Init::Bootstrap(url) => {
                tracing::info!(url = %url, "bootstrapping state");
                self.inner.state.set_state(
                    METHODS_KEY,
                    MethodTable::single(STATE_LOAD_METHOD, Verb::Get, &url),
                    None,
                );
                if self.reload_state().await? == ReloadOutcome::Failed {
                    return Err(BinderyError::BootstrapFailed(url));
                }
            }
        }

        if let Some(debug) = options.debug {
            self.enable_debug(debug);
        }
        if options.live {
            self.live_state()?;
        }

        self.show_view(view, false).await
    }
}

/// Bulk-apply a `state.load` response. `null` means nothing to apply.
fn apply_state(state: &StateStore, value: Value) {
    match value {
        Value::Object(map) => state.set_state_bulk(&map, None),
        Value::Null => {}
        other => tracing::warn!(response = %other, "state response is not a mapping"),
    }
}
