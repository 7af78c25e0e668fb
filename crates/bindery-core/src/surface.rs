//! # Surfaces
//!
//! Named modals and interface panels with a two-step lifecycle:
//!
//! 1. `prepare` runs once at bootstrap. The element is marked with its
//!    category class first, then the behaviour's own setup runs.
//! 2. `refresh` runs on every `show` and may veto the display. When it
//!    allows it, every other surface of the same category is hidden first.
//!
//! Two specialised behaviours ship with the engine: [`ConfirmBehavior`]
//! (before/after list difference, skipped when nothing changed) and
//! [`AlertBehavior`] (title and message).

use crate::element::ElementRef;
use crate::external::External;
use crate::lists::{changes, str_array};
use crate::primitives::{DEFAULT_ALERT_TITLE, DEFAULT_CONFIRM_EMPTY};
use crate::settings::Settings;
use crate::types::{BinderyError, StateMap, SurfaceKind, Value};
use futures::channel::oneshot;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

// =============================================================================
// ARGUMENTS AND RESUMPTION
// =============================================================================

/// One-shot continuation for whoever is waiting on a surface.
#[derive(Debug)]
pub struct Resume(oneshot::Sender<bool>);

impl Resume {
    /// Create a continuation and the receiver that observes it.
    #[must_use]
    pub fn channel() -> (Self, oneshot::Receiver<bool>) {
        let (tx, rx) = oneshot::channel();
        (Self(tx), rx)
    }

    /// Resume the waiting caller. Consumes the continuation.
    pub fn resume(self, accepted: bool) {
        if self.0.send(accepted).is_err() {
            tracing::debug!("resumed caller no longer waiting");
        }
    }
}

/// Arguments handed to `refresh`.
#[derive(Debug, Default)]
pub struct SurfaceArgs {
    pub values: StateMap,
    resume: RefCell<Option<Resume>>,
}

impl SurfaceArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_resume(self, resume: Resume) -> Self {
        *self.resume.borrow_mut() = Some(resume);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Take the continuation, leaving `None` behind.
    pub fn take_resume(&self) -> Option<Resume> {
        self.resume.borrow_mut().take()
    }
}

/// What a behaviour may touch while preparing or refreshing.
pub struct SurfaceContext<'a> {
    pub name: &'a str,
    pub element: &'a ElementRef,
    pub external: &'a External,
    pub settings: &'a Settings,
}

// =============================================================================
// BEHAVIOURS
// =============================================================================

/// Lifecycle hooks of a surface. Both default to doing nothing.
pub trait SurfaceBehavior {
    fn prepare(&self, _ctx: &SurfaceContext<'_>) -> Result<(), BinderyError> {
        Ok(())
    }

    /// Return `false` to skip showing the surface.
    fn refresh(&self, _ctx: &SurfaceContext<'_>, _args: &SurfaceArgs) -> Result<bool, BinderyError> {
        Ok(true)
    }

    /// Handle a save (`true`) or cancel (`false`) action. Returns whether a
    /// waiting caller was resumed.
    fn respond(&self, _accepted: bool) -> bool {
        false
    }
}

type PrepareHook = Box<dyn Fn(&SurfaceContext<'_>) -> Result<(), BinderyError>>;
type RefreshHook = Box<dyn Fn(&SurfaceContext<'_>, &SurfaceArgs) -> Result<bool, BinderyError>>;

/// Closure-based behaviour for ordinary surfaces.
#[derive(Default)]
pub struct SurfaceHooks {
    prepare: Option<PrepareHook>,
    refresh: Option<RefreshHook>,
}

impl SurfaceHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_prepare(
        mut self,
        hook: impl Fn(&SurfaceContext<'_>) -> Result<(), BinderyError> + 'static,
    ) -> Self {
        self.prepare = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_refresh(
        mut self,
        hook: impl Fn(&SurfaceContext<'_>, &SurfaceArgs) -> Result<bool, BinderyError> + 'static,
    ) -> Self {
        self.refresh = Some(Box::new(hook));
        self
    }
}

impl SurfaceBehavior for SurfaceHooks {
    fn prepare(&self, ctx: &SurfaceContext<'_>) -> Result<(), BinderyError> {
        self.prepare.as_ref().map_or(Ok(()), |hook| hook(ctx))
    }

    fn refresh(&self, ctx: &SurfaceContext<'_>, args: &SurfaceArgs) -> Result<bool, BinderyError> {
        self.refresh.as_ref().map_or(Ok(true), |hook| hook(ctx, args))
    }
}

/// Shows the difference between `previous` and `next` string lists.
///
/// Recognised arguments: `previous`, `next`, `empty_message`. With no
/// difference the waiting caller is resumed with `true` and nothing is shown.
#[derive(Default)]
pub struct ConfirmBehavior {
    pending: RefCell<Option<Resume>>,
}

impl SurfaceBehavior for ConfirmBehavior {
    fn refresh(&self, ctx: &SurfaceContext<'_>, args: &SurfaceArgs) -> Result<bool, BinderyError> {
        let separators = &ctx.settings.separators;
        let list = |key: &str| match args.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(v) => str_array(v, separators),
        };
        let diff = changes(&list("previous")?, &list("next")?);

        if diff.is_empty() {
            if let Some(resume) = args.take_resume() {
                resume.resume(true);
            }
            return Ok(false);
        }

        let empty = args
            .get("empty_message")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CONFIRM_EMPTY)
            .to_string();
        let or_empty = |items: &[String]| {
            if items.is_empty() {
                vec![empty.clone()]
            } else {
                items.to_vec()
            }
        };

        let slots = &ctx.settings.changes;
        let renderer = ctx.external.renderer()?;
        renderer.fill_text(ctx.element, &slots.added_count, &diff.add.len().to_string());
        renderer.fill_text(ctx.element, &slots.removed_count, &diff.rem.len().to_string());
        renderer.fill_list(ctx.element, &slots.added, &or_empty(&diff.add));
        renderer.fill_list(ctx.element, &slots.removed, &or_empty(&diff.rem));

        *self.pending.borrow_mut() = args.take_resume();
        Ok(true)
    }

    fn respond(&self, accepted: bool) -> bool {
        match self.pending.borrow_mut().take() {
            Some(resume) => {
                resume.resume(accepted);
                true
            }
            None => false,
        }
    }
}

/// Shows a `title` / `message` pair. Any response resumes with `true`.
#[derive(Default)]
pub struct AlertBehavior {
    pending: RefCell<Option<Resume>>,
}

impl SurfaceBehavior for AlertBehavior {
    fn refresh(&self, ctx: &SurfaceContext<'_>, args: &SurfaceArgs) -> Result<bool, BinderyError> {
        let text = |key: &str, default: &str| {
            args.get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        let slots = &ctx.settings.alert;
        let renderer = ctx.external.renderer()?;
        renderer.fill_text(ctx.element, &slots.title, &text("title", DEFAULT_ALERT_TITLE));
        renderer.fill_text(ctx.element, &slots.message, &text("message", ""));

        *self.pending.borrow_mut() = args.take_resume();
        Ok(true)
    }

    fn respond(&self, _accepted: bool) -> bool {
        match self.pending.borrow_mut().take() {
            Some(resume) => {
                resume.resume(true);
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Clone)]
struct Surface {
    element: ElementRef,
    behavior: Rc<dyn SurfaceBehavior>,
}

/// All surfaces of one category.
#[derive(Clone)]
pub struct SurfaceRegistry {
    kind: SurfaceKind,
    external: External,
    settings: Rc<Settings>,
    surfaces: Rc<RefCell<BTreeMap<String, Surface>>>,
}

impl std::fmt::Debug for SurfaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceRegistry")
            .field("kind", &self.kind)
            .field("names", &self.names())
            .finish()
    }
}

impl SurfaceRegistry {
    #[must_use]
    pub fn new(kind: SurfaceKind, external: External, settings: Rc<Settings>) -> Self {
        Self {
            kind,
            external,
            settings,
            surfaces: Rc::default(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    /// Register (or replace) a surface.
    pub fn define(&self, name: &str, element: ElementRef, behavior: impl SurfaceBehavior + 'static) {
        self.surfaces.borrow_mut().insert(
            name.to_string(),
            Surface {
                element,
                behavior: Rc::new(behavior),
            },
        );
    }

    /// Element of a defined surface.
    #[must_use]
    pub fn element(&self, name: &str) -> Option<ElementRef> {
        self.surfaces.borrow().get(name).map(|s| Rc::clone(&s.element))
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.surfaces.borrow().keys().cloned().collect()
    }

    /// Run `prepare` for every surface, in name order.
    pub fn prepare_all(&self) -> Result<(), BinderyError> {
        let class = match self.kind {
            SurfaceKind::Modal => &self.settings.types.modal,
            SurfaceKind::Interface => &self.settings.types.interface,
        };
        let surfaces: Vec<(String, Surface)> = self
            .surfaces
            .borrow()
            .iter()
            .map(|(n, s)| (n.clone(), s.clone()))
            .collect();

        for (name, surface) in surfaces {
            surface.element.add_class(class);
            surface.behavior.prepare(&self.context(&name, &surface.element))?;
        }
        Ok(())
    }

    /// Refresh and, unless vetoed, show `name` alone. Returns whether shown.
    pub fn show(&self, name: &str, args: &SurfaceArgs) -> Result<bool, BinderyError> {
        let surface = self.lookup(name)?;
        if !surface.behavior.refresh(&self.context(name, &surface.element), args)? {
            tracing::debug!(kind = %self.kind, name, "show vetoed by refresh");
            return Ok(false);
        }

        let renderer = self.external.renderer()?;
        self.hide_all()?;
        match self.kind {
            SurfaceKind::Modal => renderer.open_modal(&surface.element),
            SurfaceKind::Interface => renderer.show_interface(&surface.element),
        }
        tracing::debug!(kind = %self.kind, name, "surface shown");
        Ok(true)
    }

    /// Hide every surface of this category.
    pub fn hide_all(&self) -> Result<(), BinderyError> {
        let renderer = self.external.renderer()?;
        match self.kind {
            SurfaceKind::Modal => renderer.close_modals(),
            SurfaceKind::Interface => renderer.hide_interfaces(),
        }
        Ok(())
    }

    /// Forward a save/cancel action to the surface's behaviour.
    pub fn respond(&self, name: &str, accepted: bool) -> Result<bool, BinderyError> {
        Ok(self.lookup(name)?.behavior.respond(accepted))
    }

    fn lookup(&self, name: &str) -> Result<Surface, BinderyError> {
        self.surfaces
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| BinderyError::UnknownSurface {
                kind: self.kind,
                name: name.to_string(),
            })
    }

    fn context<'a>(&'a self, name: &'a str, element: &'a ElementRef) -> SurfaceContext<'a> {
        SurfaceContext {
            name,
            element,
            external: &self.external,
            settings: &self.settings,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
