//! # External Capabilities
//!
//! Rendering, notifications and transport are supplied by the host. The
//! engine only calls them at fixed lifecycle points and fails with
//! `RequirementMissing` when one is needed but was never installed.
//!
//! The textual bridge (`modal("open")`, `lock("hide")`, ...) is kept for
//! scripted hosts; every command name parses into a typed method and unknown
//! names fail with the matching `Unknown*Method` error.

use crate::element::ElementRef;
use crate::remote::Transport;
use crate::types::{BinderyError, Value};
use async_trait::async_trait;
use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

// =============================================================================
// CAPABILITY CONTRACTS
// =============================================================================

/// Opens and closes modal chrome, shows and hides interface panels.
pub trait SurfaceRenderer {
    fn open_modal(&self, element: &ElementRef);
    fn close_modals(&self);
    fn show_interface(&self, element: &ElementRef);
    fn hide_interfaces(&self);

    /// Replace the text of the slot marked with class `slot` inside `element`.
    fn fill_text(&self, element: &ElementRef, slot: &str, text: &str);
    /// Replace the items of the list slot marked with class `slot`.
    fn fill_list(&self, element: &ElementRef, slot: &str, items: &[String]);
}

/// Transient messages and the blocking loading indicator.
///
/// The hide operations complete once the indicator is gone; callers await
/// them before running follow-up logic.
#[async_trait(?Send)]
pub trait Notifier {
    fn show_message(&self, text: &str, important: bool);
    fn show_error(&self, text: &str);
    async fn hide_message(&self);
    fn show_loading(&self);
    async fn hide_loading(&self);
}

// =============================================================================
// TEXTUAL METHODS
// =============================================================================

macro_rules! textual_method {
    ($(#[$meta:meta])* $name:ident, $err:ident, { $($text:literal => $variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl FromStr for $name {
            type Err = BinderyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(BinderyError::$err(other.to_string())),
                }
            }
        }
    };
}

textual_method!(
    /// Modal bridge commands.
    ModalMethod, UnknownModalMethod, { "open" => Open, "close" => Close }
);

textual_method!(
    /// Message bridge commands.
    MessageMethod, UnknownMessageMethod, { "show" => Show, "error" => Error, "hide" => Hide }
);

textual_method!(
    /// Loading-lock bridge commands.
    LockMethod, UnknownLockMethod, { "show" => Show, "hide" => Hide }
);

textual_method!(
    /// Socket bridge commands.
    SocketMethod, UnknownSocketMethod, { "await" => Await }
);

// =============================================================================
// CAPABILITY SET
// =============================================================================

#[derive(Default)]
struct Slots {
    renderer: Option<Rc<dyn SurfaceRenderer>>,
    notifier: Option<Rc<dyn Notifier>>,
    transport: Option<Rc<dyn Transport>>,
}

/// The installed capabilities, shared by every engine component.
#[derive(Clone, Default)]
pub struct External {
    slots: Rc<RefCell<Slots>>,
}

impl std::fmt::Debug for External {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.borrow();
        f.debug_struct("External")
            .field("renderer", &slots.renderer.is_some())
            .field("notifier", &slots.notifier.is_some())
            .field("transport", &slots.transport.is_some())
            .finish()
    }
}

impl External {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install_renderer(&self, renderer: Rc<dyn SurfaceRenderer>) {
        self.slots.borrow_mut().renderer = Some(renderer);
    }

    pub fn install_notifier(&self, notifier: Rc<dyn Notifier>) {
        self.slots.borrow_mut().notifier = Some(notifier);
    }

    /// Install a transport, returning the one it replaces.
    pub fn install_transport(&self, transport: Rc<dyn Transport>) -> Option<Rc<dyn Transport>> {
        self.slots.borrow_mut().transport.replace(transport)
    }

    pub fn renderer(&self) -> Result<Rc<dyn SurfaceRenderer>, BinderyError> {
        self.slots
            .borrow()
            .renderer
            .clone()
            .ok_or(BinderyError::RequirementMissing("surface renderer"))
    }

    pub fn notifier(&self) -> Result<Rc<dyn Notifier>, BinderyError> {
        self.slots
            .borrow()
            .notifier
            .clone()
            .ok_or(BinderyError::RequirementMissing("notifier"))
    }

    pub fn transport(&self) -> Result<Rc<dyn Transport>, BinderyError> {
        self.slots
            .borrow()
            .transport
            .clone()
            .ok_or(BinderyError::RequirementMissing("transport"))
    }

    // =========================================================================
    // TEXTUAL BRIDGE
    // =========================================================================

    /// `modal("open", element)` / `modal("close", None)`.
    pub fn modal(&self, method: &str, element: Option<&ElementRef>) -> Result<(), BinderyError> {
        let renderer = self.renderer()?;
        match method.parse::<ModalMethod>()? {
            ModalMethod::Close => renderer.close_modals(),
            ModalMethod::Open => {
                let element = element.ok_or(BinderyError::RequirementMissing("modal element"))?;
                renderer.open_modal(element);
            }
        }
        Ok(())
    }

    /// `message("show" | "error" | "hide", text, important)`.
    pub async fn message(&self, method: &str, text: &str, important: bool) -> Result<(), BinderyError> {
        let method = method.parse::<MessageMethod>()?;
        let notifier = self.notifier()?;
        match method {
            MessageMethod::Show => notifier.show_message(text, important),
            MessageMethod::Error => notifier.show_error(text),
            MessageMethod::Hide => notifier.hide_message().await,
        }
        Ok(())
    }

    /// `lock("show" | "hide")`.
    pub async fn lock(&self, method: &str) -> Result<(), BinderyError> {
        let method = method.parse::<LockMethod>()?;
        let notifier = self.notifier()?;
        match method {
            LockMethod::Show => notifier.show_loading(),
            LockMethod::Hide => notifier.hide_loading().await,
        }
        Ok(())
    }

    /// `socket("await", url, data)`: a stream of polled responses.
    pub fn socket(
        &self,
        method: &str,
        url: &str,
        data: &Value,
        interval: std::time::Duration,
    ) -> Result<crate::remote::ResponseStream, BinderyError> {
        match method.parse::<SocketMethod>()? {
            SocketMethod::Await => Ok(self.transport()?.subscribe(url, data, interval)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
