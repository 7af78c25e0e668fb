//! # Remote Dispatcher
//!
//! Logical method names (`"friend.save"`) resolve through the method table
//! held in state under `"methods"`:
//!
//! ```json
//! { "methods": { "friend.save": ["post", "/password/save"] } }
//! ```
//!
//! A call shows the loading lock, dispatches through the installed
//! [`Transport`], hides the lock, then reports success or failure to the user.
//! Failures become [`RemoteOutcome::Failure`]; only lookup and configuration
//! errors are returned as `Err`, and only while debug mode is active.

use crate::external::External;
use crate::primitives::METHODS_KEY;
use crate::settings::NetworkSettings;
use crate::state::StateStore;
use crate::types::{BinderyError, TransportError, Value};
use async_trait::async_trait;
use futures::stream::{LocalBoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;
use tokio::task::JoinHandle;

// =============================================================================
// TRANSPORT CONTRACT
// =============================================================================

/// Responses delivered by a subscription, in arrival order.
pub type ResponseStream = LocalBoxStream<'static, Result<Value, TransportError>>;

/// Transport verbs a method table may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Get,
    Post,
}

impl FromStr for Verb {
    type Err = BinderyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            _ => Err(BinderyError::UnknownTransportVerb(s.to_string())),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// Sends requests on behalf of the engine. Payloads pass through untouched.
#[async_trait(?Send)]
pub trait Transport {
    /// Perform one request and decode its response body.
    async fn send(&self, verb: Verb, url: &str, data: &Value) -> Result<Value, TransportError>;

    /// Fetch `url` now and then every `interval`, forever.
    fn subscribe(&self, url: &str, data: &Value, interval: Duration) -> ResponseStream;
}

/// Build a subscription stream from a fetch closure: fetch immediately, then
/// once per `interval`.
pub fn poll_stream<F, Fut>(interval: Duration, fetch: F) -> ResponseStream
where
    F: FnMut() -> Fut + 'static,
    Fut: Future<Output = Result<Value, TransportError>> + 'static,
{
    futures::stream::unfold((fetch, false), move |(mut fetch, waited)| async move {
        if waited {
            tokio::time::sleep(interval).await;
        }
        let item = fetch().await;
        Some((item, (fetch, true)))
    })
    .boxed_local()
}

// =============================================================================
// METHOD TABLE
// =============================================================================

/// One resolved method table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub verb: Verb,
    pub url: String,
}

/// Snapshot of the method table stored in state.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    entries: serde_json::Map<String, Value>,
}

impl MethodTable {
    /// Read the table from state. An unset table is empty.
    pub fn from_state(state: &StateStore) -> Result<Self, BinderyError> {
        match state.get(METHODS_KEY) {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(entries)) => Ok(Self { entries }),
            Some(_) => Err(BinderyError::MalformedMethodTable(METHODS_KEY.to_string())),
        }
    }

    /// A table holding a single `name -> [verb, url]` entry.
    #[must_use]
    pub fn single(name: &str, verb: Verb, url: &str) -> Value {
        let verb = match verb {
            Verb::Get => "get",
            Verb::Post => "post",
        };
        let mut table = serde_json::Map::new();
        table.insert(name.to_string(), serde_json::json!([verb, url]));
        Value::Object(table)
    }

    /// Resolve `name`, failing with `UnknownRemoteMethod` when absent.
    pub fn route(&self, name: &str) -> Result<Route, BinderyError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| BinderyError::UnknownRemoteMethod(name.to_string()))?;

        match entry.as_array().map(Vec::as_slice) {
            Some([Value::String(verb), Value::String(url)]) => Ok(Route {
                verb: verb.parse()?,
                url: url.clone(),
            }),
            _ => Err(BinderyError::MalformedMethodTable(name.to_string())),
        }
    }

    /// Logical method names, in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Process-wide debug switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugMode {
    #[default]
    Off,
    /// Errors re-raise, state writes are logged.
    Debug,
    /// Debug plus canned transport responses.
    Offline,
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RemoteOptions {
    /// Success message; the network default when `None`.
    pub success: Option<String>,
    /// Failure message; the network default when `None`.
    pub failure: Option<String>,
    /// Suppress success and failure messages.
    pub silent: bool,
    /// Skip the loading lock.
    pub background: bool,
}

impl RemoteOptions {
    #[must_use]
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn background(mut self) -> Self {
        self.background = true;
        self
    }
}

/// Result of a remote call once user feedback has been given.
#[derive(Debug)]
pub enum RemoteOutcome {
    Success(Value),
    Failure(BinderyError),
}

impl RemoteOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Resolves logical methods and runs them with lock and message side effects.
#[derive(Clone)]
pub struct RemoteDispatcher {
    state: StateStore,
    external: External,
    network: Rc<NetworkSettings>,
    debug: Rc<Cell<DebugMode>>,
}

impl fmt::Debug for RemoteDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteDispatcher")
            .field("debug", &self.debug.get())
            .field("external", &self.external)
            .finish()
    }
}

impl RemoteDispatcher {
    #[must_use]
    pub fn new(state: StateStore, external: External, network: NetworkSettings) -> Self {
        Self {
            state,
            external,
            network: Rc::new(network),
            debug: Rc::default(),
        }
    }

    #[must_use]
    pub fn debug_mode(&self) -> DebugMode {
        self.debug.get()
    }

    pub fn set_debug_mode(&self, mode: DebugMode) {
        self.debug.set(mode);
    }

    /// Resolve `method` against the current table.
    pub fn route(&self, method: &str) -> Result<Route, BinderyError> {
        MethodTable::from_state(&self.state)?.route(method)
    }

    /// Call `method` with `data`.
    ///
    /// Ordering: lock shown, request sent, lock hidden, message shown,
    /// outcome returned. Exactly one outcome is produced per call.
    pub async fn remote_call(
        &self,
        method: &str,
        data: &Value,
        options: &RemoteOptions,
    ) -> Result<RemoteOutcome, BinderyError> {
        if !options.background {
            self.external.notifier()?.show_loading();
        }

        let attempt = self.dispatch(method, data).await;

        if !options.background {
            self.external.notifier()?.hide_loading().await;
        }

        match attempt {
            Ok(Ok(value)) => {
                if !options.silent {
                    let text = options.success.as_deref().unwrap_or(&self.network.success);
                    self.external.notifier()?.show_message(text, false);
                }
                Ok(RemoteOutcome::Success(value))
            }
            Ok(Err(error)) => {
                tracing::warn!(method, error = %error, "remote call failed");
                self.report_failure(options)?;
                Ok(RemoteOutcome::Failure(error.into()))
            }
            Err(error) => {
                tracing::warn!(method, error = %error, "remote call aborted");
                self.report_failure(options)?;
                if self.debug.get() == DebugMode::Off {
                    Ok(RemoteOutcome::Failure(error))
                } else {
                    Err(error)
                }
            }
        }
    }

    /// Subscribe to `method`, invoking `on_each` for every response.
    ///
    /// The subscription runs on the current `LocalSet` until the returned
    /// handle is aborted or the runtime shuts down.
    ///
    /// # Panics
    ///
    /// Panics when called outside a `LocalSet`.
    pub fn remote_poll(
        &self,
        method: &str,
        data: &Value,
        on_each: impl Fn(Value) + 'static,
    ) -> Result<JoinHandle<()>, BinderyError> {
        let route = self.route(method)?;
        let interval = Duration::from_millis(self.network.poll_ms);
        let mut responses = self.external.socket("await", &route.url, data, interval)?;
        let method = method.to_string();

        Ok(tokio::task::spawn_local(async move {
            while let Some(response) = responses.next().await {
                match response {
                    Ok(value) => on_each(value),
                    Err(error) => tracing::warn!(method = %method, error = %error, "poll failed"),
                }
            }
        }))
    }

    async fn dispatch(
        &self,
        method: &str,
        data: &Value,
    ) -> Result<Result<Value, TransportError>, BinderyError> {
        let route = self.route(method)?;
        let transport = self.external.transport()?;
        tracing::debug!(method, verb = %route.verb, url = %route.url, "remote call");
        Ok(transport.send(route.verb, &route.url, data).await)
    }

    fn report_failure(&self, options: &RemoteOptions) -> Result<(), BinderyError> {
        if !options.silent {
            let text = options.failure.as_deref().unwrap_or(&self.network.failure);
            self.external.notifier()?.show_error(text);
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verbs_parse_case_insensitively() {
        assert_eq!("GET".parse::<Verb>().ok(), Some(Verb::Get));
        assert_eq!("post".parse::<Verb>().ok(), Some(Verb::Post));
        assert!(matches!(
            "delete".parse::<Verb>(),
            Err(BinderyError::UnknownTransportVerb(v)) if v == "delete"
        ));
    }

    #[test]
    fn method_table_resolves_routes() {
        let state = StateStore::new();
        state.set_state(
            METHODS_KEY,
            json!({"friend.save": ["post", "/password/save"], "bad": ["post"]}),
            None,
        );
        let table = MethodTable::from_state(&state).expect("table");
        assert_eq!(
            table.route("friend.save").expect("route"),
            Route {
                verb: Verb::Post,
                url: "/password/save".into()
            }
        );
        assert!(matches!(
            table.route("missing"),
            Err(BinderyError::UnknownRemoteMethod(m)) if m == "missing"
        ));
        assert!(matches!(table.route("bad"), Err(BinderyError::MalformedMethodTable(_))));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["friend.save", "bad"]);
    }

    #[test]
    fn unset_table_is_empty_and_scalars_are_rejected() {
        let state = StateStore::new();
        assert_eq!(MethodTable::from_state(&state).expect("table").names().count(), 0);
        state.set_state(METHODS_KEY, json!("nope"), None);
        assert!(matches!(
            MethodTable::from_state(&state),
            Err(BinderyError::MalformedMethodTable(_))
        ));
    }

    #[test]
    fn single_entry_table_shape() {
        assert_eq!(
            MethodTable::single("state.load", Verb::Get, "/boot"),
            json!({"state.load": ["get", "/boot"]})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn poll_stream_waits_between_fetches() {
        let calls = Rc::new(Cell::new(0u64));
        let counter = Rc::clone(&calls);
        let mut stream = poll_stream(Duration::from_secs(30), move || {
            counter.set(counter.get() + 1);
            let n = counter.get();
            async move { Ok(json!(n)) }
        });

        let start = tokio::time::Instant::now();
        assert_eq!(stream.next().await, Some(Ok(json!(1))));
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(stream.next().await, Some(Ok(json!(2))));
        assert!(start.elapsed() >= Duration::from_secs(30));
        assert_eq!(calls.get(), 2);
    }
}
