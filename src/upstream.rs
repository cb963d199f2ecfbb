//! Upstream delegation client
//!
//! Talks to the real network service when connection settings are
//! configured. Two call shapes exist: typed fetches that feed the
//! cache-through store (profile, per-user posts) and a verbatim relay used
//! for proxy passthrough of unhandled API paths.
//!
//! The upstream is an opaque, possibly-unavailable oracle. Typed fetches
//! translate any non-success status into `Ok(None)` so the cache layer can
//! degrade to "nothing cached, nothing found"; only transport failures
//! surface as errors, and the cache layer swallows those too.

use bytes::Bytes;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::Args;
use crate::types::{EngineError, Result};

pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_key_header: String,
}

/// A relayed upstream response, served back to the caller verbatim
pub struct RelayedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamClient {
    pub fn new(base_url: &str, api_key: &str, api_key_header: &str, timeout_ms: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_key_header: api_key_header.to_string(),
        }
    }

    /// Build a client when both upstream settings are present
    pub fn from_args(args: &Args) -> Option<Self> {
        match (&args.upstream_base_url, &args.upstream_api_key) {
            (Some(base), Some(key)) => Some(Self::new(
                base,
                key,
                &args.upstream_api_key_header,
                args.upstream_timeout_ms,
            )),
            _ => None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch a profile by identifier. Non-success statuses are a miss.
    pub async fn fetch_profile(&self, identifier: &str) -> Result<Option<Value>> {
        let url = self.url(&format!("/api/v1/users/{}", identifier));
        let response = self
            .http
            .get(&url)
            .header(self.api_key_header.as_str(), self.api_key.as_str())
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), identifier, "upstream profile fetch missed");
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    /// Fetch a user's posts. The result is normalized to `{"items": [...]}`
    /// so the cache entry shape does not depend on the upstream's envelope.
    pub async fn fetch_user_posts(&self, identifier: &str) -> Result<Option<Value>> {
        let url = self.url(&format!("/api/v1/users/{}/posts", identifier));
        let response = self
            .http
            .get(&url)
            .header(self.api_key_header.as_str(), self.api_key.as_str())
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), identifier, "upstream posts fetch missed");
            return Ok(None);
        }

        let payload: Value = response.json().await?;
        let items = match payload {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("items") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        Ok(Some(json!({ "items": items })))
    }

    /// Forward an unhandled request verbatim and relay whatever comes back,
    /// success or not. Transport failures surface as [`EngineError::Upstream`].
    pub async fn relay(
        &self,
        method: &hyper::Method,
        path_and_query: &str,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<RelayedResponse> {
        let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .map_err(|_| EngineError::Upstream(format!("unsupported method {}", method)))?;
        let url = self.url(path_and_query);

        let mut builder = self
            .http
            .request(method, &url)
            .header(self.api_key_header.as_str(), self.api_key.as_str());
        if let Some(ct) = content_type {
            builder = builder.header("Content-Type", ct);
        }
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        debug!(status, url = %url, size = body.len(), "upstream relay completed");
        Ok(RelayedResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = UpstreamClient::new("https://api.example.com/", "k", "X-API-KEY", 1000);
        assert_eq!(
            client.url("/api/v1/users/u1"),
            "https://api.example.com/api/v1/users/u1"
        );
    }

    #[test]
    fn test_from_args_requires_both_settings() {
        let none = Args::parse_from(["understudy"]);
        assert!(UpstreamClient::from_args(&none).is_none());

        let partial = Args::parse_from(["understudy", "--upstream-api-key", "k"]);
        assert!(UpstreamClient::from_args(&partial).is_none());

        let full = Args::parse_from([
            "understudy",
            "--upstream-base-url",
            "https://api.example.com",
            "--upstream-api-key",
            "k",
        ]);
        assert!(UpstreamClient::from_args(&full).is_some());
    }
}
