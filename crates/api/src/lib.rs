//! Provider HTTP transport.
//!
//! This module provides a thin client for executing planned upstream calls
//! against data providers. It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults
//! - Validating call URLs for safety (https outside localhost, a hard
//!   length ceiling) before any I/O happens
//! - Applying the per-call timeout, clamped to a hard ceiling
//! - Treating non-2xx statuses and transport errors as failure descriptors
//!   rather than early returns, so sibling calls keep running
//!
//! The primary entry point is [`ProviderClient`]. Create an instance via
//! [`ProviderClient::new`], and then execute planned calls with
//! [`ProviderClient::execute`].

use std::time::Duration;

use anyhow::{Context, Result};
use oraclet_types::{OutboundCall, ProviderResponse};
use reqwest::{Client, Method, Url, header};
use serde_json::Value;
use tracing::debug;

/// Default per-call timeout applied when a call does not specify one.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 5_000;
/// Hard ceiling for per-call timeouts.
pub const MAX_CALL_TIMEOUT_MS: u64 = 9_000;
/// Hard ceiling for a finished call URL, in bytes.
pub const MAX_URL_BYTES: usize = 2_048;

/// Hostnames allowed to use plain http, for local development and tests.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for provider access.
///
/// One client serves every provider; per-call headers and query parameters
/// come from the planned [`OutboundCall`].
pub struct ProviderClient {
    http: Client,
    user_agent: String,
}

impl ProviderClient {
    /// Construct a [`ProviderClient`] with default headers and the hard
    /// timeout ceiling as a backstop.
    pub fn new() -> Result<Self> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_millis(MAX_CALL_TIMEOUT_MS))
            .build()
            .context("build http client")?;

        Ok(Self {
            http,
            user_agent: format!("oraclet/0.1; {}", std::env::consts::OS),
        })
    }

    /// Execute one planned call.
    ///
    /// Every failure mode (an unacceptable URL, a timeout above the
    /// ceiling, a transport error, a non-2xx status, an unparseable body)
    /// is returned as a failure descriptor on the [`ProviderResponse`],
    /// never as an error that would abort sibling calls.
    pub async fn execute(&self, call: &OutboundCall) -> ProviderResponse {
        let url = match validate_call_url(&call.url) {
            Ok(url) => url,
            Err(reason) => return ProviderResponse::failure(call.provider.clone(), None, reason),
        };
        let method = match Method::from_bytes(call.method.as_bytes()) {
            Ok(method) => method,
            Err(error) => {
                return ProviderResponse::failure(call.provider.clone(), None, format!("invalid method '{}': {}", call.method, error));
            }
        };
        let timeout = match effective_timeout(call.timeout_ms) {
            Ok(timeout) => timeout,
            Err(reason) => return ProviderResponse::failure(call.provider.clone(), None, reason),
        };

        let mut builder = self
            .http
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent)
            .timeout(timeout);
        if !call.query.is_empty() {
            builder = builder.query(&call.query);
        }
        for (name, value) in &call.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &call.body {
            builder = builder.json(body);
        }

        debug!(provider = %call.provider, "issuing upstream call");
        let response = match builder.send().await {
            Ok(response) => response,
            Err(error) => {
                let status = error.status().map(|status| status.as_u16());
                return ProviderResponse::failure(call.provider.clone(), status, format!("network error: {}", error));
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return ProviderResponse::failure(call.provider.clone(), Some(status.as_u16()), format!("HTTP {}: {}", status.as_u16(), text));
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(payload) => ProviderResponse::success(call.provider.clone(), payload),
            Err(error) => ProviderResponse::failure(call.provider.clone(), Some(status.as_u16()), format!("invalid JSON payload: {}", error)),
        }
    }
}

/// Validate that a finished call URL is acceptable for upstream use.
///
/// Rules:
/// - must parse and carry a host
/// - `localhost`/`127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be https
/// - at most [`MAX_URL_BYTES`] bytes
fn validate_call_url(raw: &str) -> Result<Url, String> {
    if raw.len() > MAX_URL_BYTES {
        return Err(format!("call URL is {} bytes, ceiling is {}", raw.len(), MAX_URL_BYTES));
    }

    let parsed = Url::parse(raw).map_err(|error| format!("invalid call URL '{}': {}", raw, error))?;
    let host_name = parsed.host_str().ok_or_else(|| format!("call URL '{}' must include a host", raw))?;

    if LOCALHOST_DOMAINS.iter().any(|&allowed| host_name.eq_ignore_ascii_case(allowed)) {
        return Ok(parsed);
    }

    if parsed.scheme() != "https" {
        return Err(format!("call URL must use https for non-localhost hosts; got '{}://'", parsed.scheme()));
    }

    Ok(parsed)
}

/// Resolve the per-call timeout, defaulting and enforcing the hard ceiling.
fn effective_timeout(requested_ms: u64) -> Result<Duration, String> {
    if requested_ms == 0 {
        return Ok(Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS));
    }
    if requested_ms > MAX_CALL_TIMEOUT_MS {
        return Err(format!(
            "per-call timeout {}ms exceeds the {}ms ceiling",
            requested_ms, MAX_CALL_TIMEOUT_MS
        ));
    }
    Ok(Duration::from_millis(requested_ms))
}
