//! # Modes and Views
//!
//! A mode is a named state patch plus optional logic, applied wholesale.
//! Mode writes carry the `"mode"` source tag.
//!
//! A view is a mode whose logic first arranges the screen:
//!
//! 1. hide every modal and interface
//! 2. show the requested modals
//! 3. show the requested interfaces
//! 4. run the custom logic

use crate::application::{Application, ReloadOutcome};
use crate::primitives::MODE_SOURCE;
use crate::surface::SurfaceArgs;
use crate::types::{BinderyError, SourceTag, StateMap};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Custom mode logic, run after the state patch.
pub type ModeLogic = Rc<dyn Fn(&Application) -> Result<(), BinderyError>>;

/// A defined mode.
pub struct Mode {
    name: String,
    patch: StateMap,
    logic: Option<ModeLogic>,
}

impl std::fmt::Debug for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mode")
            .field("name", &self.name)
            .field("patch", &self.patch)
            .field("logic", &self.logic.is_some())
            .finish()
    }
}

impl Mode {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn patch(&self) -> &StateMap {
        &self.patch
    }

    /// Bulk-write the patch, then run the logic.
    pub fn apply(&self, app: &Application) -> Result<(), BinderyError> {
        tracing::debug!(mode = %self.name, keys = self.patch.len(), "applying mode");
        app.state()
            .set_state_bulk(&self.patch, Some(&SourceTag::named(MODE_SOURCE)));
        match &self.logic {
            Some(logic) => logic(app),
            None => Ok(()),
        }
    }
}

/// Declarative screen requirements of a view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSpec {
    pub state: StateMap,
    pub modals: Vec<String>,
    pub interfaces: Vec<String>,
}

/// Registry of modes (views included).
#[derive(Clone, Default)]
pub struct ModeEngine {
    modes: Rc<RefCell<BTreeMap<String, Rc<Mode>>>>,
}

impl std::fmt::Debug for ModeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeEngine").field("names", &self.names()).finish()
    }
}

impl ModeEngine {
    /// Register (or replace) a mode.
    pub fn define(&self, name: &str, patch: StateMap, logic: Option<ModeLogic>) {
        self.modes.borrow_mut().insert(
            name.to_string(),
            Rc::new(Mode {
                name: name.to_string(),
                patch,
                logic,
            }),
        );
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Rc<Mode>> {
        self.modes.borrow().get(name).cloned()
    }

    pub fn require(&self, name: &str) -> Result<Rc<Mode>, BinderyError> {
        self.get(name)
            .ok_or_else(|| BinderyError::UnknownMode(name.to_string()))
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.modes.borrow().keys().cloned().collect()
    }
}

impl Application {
    /// Define a mode.
    pub fn define_mode(&self, name: &str, patch: StateMap, logic: Option<ModeLogic>) {
        self.modes().define(name, patch, logic);
    }

    /// Define a view: a mode that arranges surfaces before its own logic.
    pub fn define_view(&self, name: &str, ui: ViewSpec, logic: Option<ModeLogic>) {
        let ViewSpec {
            state,
            modals,
            interfaces,
        } = ui;

        let arrange: ModeLogic = Rc::new(move |app: &Application| {
            app.hide()?;
            for modal in &modals {
                app.show_modal(modal, &SurfaceArgs::new())?;
            }
            for interface in &interfaces {
                app.show_interface(interface, &SurfaceArgs::new())?;
            }
            match &logic {
                Some(logic) => logic(app),
                None => Ok(()),
            }
        });

        self.modes().define(name, state, Some(arrange));
    }

    /// Activate a mode. With `remote`, state is reloaded first and the mode
    /// is applied once the reload has completed.
    pub async fn set_mode(&self, name: &str, remote: bool) -> Result<(), BinderyError> {
        let mode = self.modes().require(name)?;
        if remote {
            match self.reload_state().await? {
                ReloadOutcome::Applied => {}
                ReloadOutcome::Superseded => {
                    tracing::debug!(mode = name, "newer state reload pending, mode not applied");
                    return Ok(());
                }
                ReloadOutcome::Failed => {
                    tracing::warn!(mode = name, "state reload failed, mode not applied");
                    return Ok(());
                }
            }
        }
        mode.apply(self)
    }

    #[must_use]
    pub fn get_mode(&self, name: &str) -> Option<Rc<Mode>> {
        self.modes().get(name)
    }

    #[must_use]
    pub fn get_view(&self, name: &str) -> Option<Rc<Mode>> {
        self.get_mode(name)
    }

    pub async fn show_view(&self, name: &str, remote: bool) -> Result<(), BinderyError> {
        self.set_mode(name, remote).await
    }

    /// Hide every modal and interface.
    pub fn hide_views(&self) -> Result<(), BinderyError> {
        self.hide_modals()?;
        self.hide_interfaces()
    }

    /// Prepare interfaces, then modals.
    pub fn prepare_views(&self) -> Result<(), BinderyError> {
        self.interfaces().prepare_all()?;
        self.modals().prepare_all()
    }

    pub fn hide(&self) -> Result<(), BinderyError> {
        self.hide_views()
    }
}
