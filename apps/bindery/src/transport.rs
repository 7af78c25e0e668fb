//! # HTTP Transport
//!
//! [`Transport`] implementation over `reqwest`.
//!
//! - `GET` sends the payload's top-level entries as query parameters
//! - `POST` sends the payload as a JSON body
//! - Relative URLs are resolved against the configured base URL
//! - An empty response body decodes to `null`

use crate::config::TransportConfig;
use crate::error::CliError;
use async_trait::async_trait;
use bindery_core::{ResponseStream, Separators, Transport, TransportError, Value, Verb, poll_stream, value_text};
use std::time::Duration;

/// HTTP client answering the engine's remote calls.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a client from the `[transport]` section.
    pub fn new(config: &TransportConfig) -> Result<Self, CliError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CliError::TransportSetup(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for a method-table entry.
    #[must_use]
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") || self.base_url.is_empty() {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{url}", self.base_url)
        } else {
            format!("{}/{url}", self.base_url)
        }
    }

    fn request(&self, verb: Verb, url: &str, data: &Value) -> reqwest::RequestBuilder {
        let url = self.resolve(url);
        match verb {
            Verb::Get => self.http.get(&url).query(&query_pairs(data)),
            Verb::Post => self.http.post(&url).json(data),
        }
    }

    /// Check the status code and decode the body.
    async fn handle_response(resp: reqwest::Response) -> Result<Value, TransportError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Parse(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| TransportError::Parse(e.to_string()))
    }
}

/// Top-level payload entries rendered as query parameters.
fn query_pairs(data: &Value) -> Vec<(String, String)> {
    let separators = Separators::default();
    match data {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), value_text(v, &separators)))
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait(?Send)]
impl Transport for HttpTransport {
    async fn send(&self, verb: Verb, url: &str, data: &Value) -> Result<Value, TransportError> {
        tracing::debug!(%verb, url, "http request");
        let resp = self
            .request(verb, url, data)
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {e}", self.resolve(url))))?;
        Self::handle_response(resp).await
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
