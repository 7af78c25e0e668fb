//! # bindery-core
//!
//! The state-binding engine for Bindery - THE LOGIC.
//!
//! This crate keeps a central key/value state synchronised, in both
//! directions, with host elements (form fields, modal dialogs, interface
//! panels). Bindings are declared with a small directive language instead of
//! per-field glue code.
//!
//! ## Layers
//!
//! - `state` → the store with change notification
//! - `directive` + `relation` → the directive language and the engine that
//!   executes or wires it
//! - `form` + `validation` → field synchronisation and submission
//! - `surface` + `mode` → modals, interfaces, modes and views
//! - `remote` + `offline` → logical remote methods over a host transport
//!
//! ## Architectural Constraints
//!
//! - Single-threaded: shared handles are `Rc`, mutation goes through
//!   `RefCell`/`Cell`, nothing here is `Send`
//! - Deterministic: listeners fire in registration order, registries iterate
//!   in key order
//! - Headless: rendering, notifications and transport are capabilities
//!   supplied by the host through `external`
//! - Async boundaries (remote calls, submit cool-down, modal transitions,
//!   polling) are futures spawned on the current tokio `LocalSet`

// =============================================================================
// MODULES
// =============================================================================

pub mod application;
pub mod directive;
pub mod element;
pub mod external;
pub mod field;
pub mod form;
pub mod lists;
pub mod mode;
pub mod offline;
pub mod primitives;
pub mod relation;
pub mod remote;
pub mod settings;
pub mod state;
pub mod surface;
pub mod types;
pub mod validation;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{BinderyError, SourceTag, StateMap, SurfaceKind, TransportError, Value, is_truthy};

// =============================================================================
// RE-EXPORTS: Binding Engine
// =============================================================================

pub use directive::{Directive, Operator, Trigger};
pub use element::{Element, ElementKind, ElementRef, EventKind, MemoryElement};
pub use field::{Field, FieldAdapter};
pub use relation::{Connector, EvalContext, Evaluator, RelationEngine};
pub use state::{Listener, StateStore};

// =============================================================================
// RE-EXPORTS: Forms and Surfaces
// =============================================================================

pub use form::{FieldSpec, Form, FormHandle, FormOptions, FormSpec, StateSpec, SubmitOutcome};
pub use mode::{Mode, ModeEngine, ModeLogic, ViewSpec};
pub use surface::{
    AlertBehavior, ConfirmBehavior, Resume, SurfaceArgs, SurfaceBehavior, SurfaceContext,
    SurfaceHooks, SurfaceRegistry,
};
pub use validation::{Rule, RuleTable, Validator, is_email};

// =============================================================================
// RE-EXPORTS: Application and Remote
// =============================================================================

pub use application::{Application, Init, ReloadOutcome, StartOptions};
pub use external::{
    External, LockMethod, MessageMethod, ModalMethod, Notifier, SocketMethod, SurfaceRenderer,
};
pub use lists::{Changes, array_str, changes, ensure_array, str_array, value_text};
pub use offline::{DebugConfig, OfflineTransport};
pub use remote::{
    DebugMode, MethodTable, RemoteDispatcher, RemoteOptions, RemoteOutcome, ResponseStream, Route,
    Transport, Verb, poll_stream,
};
pub use settings::{Separators, Settings};
