//! # Offline Transport
//!
//! Debug-mode stand-in for the real transport. Every request is answered
//! from a table of canned responses keyed by URL, after a fixed latency.
//!
//! - A missing URL falls back to the `"*"` entry, then to `null`.
//! - A response equal to `"%state%"` answers with a snapshot of the live
//!   state, which lets `state.load` round-trip without a backend.

use crate::primitives::{DEFAULT_OFFLINE_LATENCY_MS, OFFLINE_FALLBACK_URL, OFFLINE_STATE_SENTINEL};
use crate::remote::{ResponseStream, Transport, Verb, poll_stream};
use crate::state::StateStore;
use crate::types::{StateMap, TransportError, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::time::Duration;

/// Options accepted by `enable_debug`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Canned responses by URL. `None` keeps the real transport.
    pub offline: Option<StateMap>,
    /// Simulated latency of every offline response.
    pub latency_ms: u64,
    /// State patch applied as soon as debug mode is enabled.
    pub testing: Option<StateMap>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            offline: None,
            latency_ms: DEFAULT_OFFLINE_LATENCY_MS,
            testing: None,
        }
    }
}

impl DebugConfig {
    /// Offline mode answering every URL with a state snapshot.
    #[must_use]
    pub fn offline_state() -> Self {
        let mut responses = StateMap::new();
        responses.insert(
            OFFLINE_FALLBACK_URL.to_string(),
            Value::String(OFFLINE_STATE_SENTINEL.to_string()),
        );
        Self {
            offline: Some(responses),
            ..Self::default()
        }
    }
}

/// Canned-response transport.
#[derive(Clone)]
pub struct OfflineTransport {
    responses: Rc<StateMap>,
    latency: Duration,
    state: StateStore,
}

impl std::fmt::Debug for OfflineTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineTransport")
            .field("urls", &self.responses.keys().collect::<Vec<_>>())
            .field("latency", &self.latency)
            .finish()
    }
}

impl OfflineTransport {
    #[must_use]
    pub fn new(responses: StateMap, latency: Duration, state: StateStore) -> Self {
        Self {
            responses: Rc::new(responses),
            latency,
            state,
        }
    }

    fn respond(&self, url: &str) -> Value {
        let canned = self
            .responses
            .get(url)
            .or_else(|| self.responses.get(OFFLINE_FALLBACK_URL))
            .cloned()
            .unwrap_or(Value::Null);

        match canned {
            Value::String(s) if s == OFFLINE_STATE_SENTINEL => Value::Object(self.state.snapshot()),
            other => other,
        }
    }
}

#[async_trait(?Send)]
impl Transport for OfflineTransport {
    async fn send(&self, verb: Verb, url: &str, data: &Value) -> Result<Value, TransportError> {
        tracing::info!(%verb, url, %data, "offline request");
        tokio::time::sleep(self.latency).await;
        Ok(self.respond(url))
    }

    fn subscribe(&self, url: &str, data: &Value, interval: Duration) -> ResponseStream {
        let this = self.clone();
        let url = url.to_string();
        let data = data.clone();
        poll_stream(interval, move || {
            let this = this.clone();
            let url = url.clone();
            let data = data.clone();
            async move { this.send(Verb::Get, &url, &data).await }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    fn transport(state: &StateStore) -> OfflineTransport {
        let mut responses = StateMap::new();
        responses.insert("/friends".into(), json!(["ada", "grace"]));
        responses.insert("/state".into(), json!(OFFLINE_STATE_SENTINEL));
        OfflineTransport::new(responses, Duration::from_millis(3000), state.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn answers_by_url_after_latency() {
        let state = StateStore::new();
        let t = transport(&state);
        let start = tokio::time::Instant::now();
        let res = t.send(Verb::Get, "/friends", &Value::Null).await;
        assert_eq!(res, Ok(json!(["ada", "grace"])));
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_url_without_fallback_is_null() {
        let t = transport(&StateStore::new());
        assert_eq!(t.send(Verb::Post, "/nope", &json!({})).await, Ok(Value::Null));
    }

    #[tokio::test(start_paused = true)]
    async fn state_sentinel_returns_snapshot() {
        let state = StateStore::new();
        state.set_state("user", json!("ada"), None);
        let t = transport(&state);
        assert_eq!(
            t.send(Verb::Get, "/state", &Value::Null).await,
            Ok(json!({"user": "ada"}))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_entry_catches_everything() {
        let state = StateStore::new();
        state.set_state("k", json!(1), None);
        let config = DebugConfig::offline_state();
        let t = OfflineTransport::new(
            config.offline.unwrap_or_default(),
            Duration::from_millis(config.latency_ms),
            state,
        );
        assert_eq!(t.send(Verb::Get, "/any", &Value::Null).await, Ok(json!({"k": 1})));
    }

    #[tokio::test(start_paused = true)]
    async fn subscription_repeats() {
        let t = transport(&StateStore::new());
        let mut stream = t.subscribe("/friends", &Value::Null, Duration::from_secs(1));
        assert_eq!(stream.next().await, Some(Ok(json!(["ada", "grace"]))));
        assert_eq!(stream.next().await, Some(Ok(json!(["ada", "grace"]))));
    }
}
