// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated session: an HTTP client bound to one credential snapshot.
//!
//! A [`Session`] never changes its token. Re-authentication builds a new
//! session and the dispatcher swaps it in whole.

use std::time::Duration;

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT,
};
use reqwest::Url;
use tracing::debug;

use crate::error::ApiError;
use crate::params::query_pairs;
use crate::prefs::Preferences;
use crate::request::RequestDescriptor;

const USER_AGENT_VALUE: &str = concat!("api-buddy/", env!("CARGO_PKG_VERSION"));
const JSON: &str = "application/json";

pub struct Session {
    client: reqwest::Client,
    headers: HeaderMap,
    timeout_secs: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authorized", &self.headers.contains_key(AUTHORIZATION))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Session {
    /// Every header the session attaches to outgoing requests.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Send one request. Query params and body go out exactly as the
    /// descriptor holds them.
    pub async fn send(&self, request: &RequestDescriptor) -> Result<reqwest::Response, ApiError> {
        let mut builder = self.client.request(request.method().into(), request.url().clone());
        let pairs = query_pairs(request.params());
        if !pairs.is_empty() {
            builder = builder.query(&pairs);
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        debug!(method = %request.method(), url = %request.url(), "sending request");
        builder.send().await.map_err(|e| transport_error(&e, request.url(), self.timeout_secs))
    }
}

/// Build a session from the preferences' current token and headers.
///
/// JSON `Accept` and `Content-Type` go out by default; the configured
/// headers are applied last and win. Makes no network call. The token is only tested by the first real request.
pub fn create_session(prefs: &Preferences) -> Result<Session, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    headers.insert(ACCEPT, HeaderValue::from_static(JSON));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));

    if let Some(oauth2) = prefs.active_oauth2() {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", oauth2.access_token))
            .map_err(|e| {
                ApiError::preferences("Your access_token has characters I can't send", e.to_string())
            })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
    }

    for (name, value) in &prefs.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| bad_header(name, e))?;
        let value = HeaderValue::from_str(value).map_err(|e| bad_header(name.as_str(), e))?;
        headers.insert(name, value);
    }

    let client = client_builder(prefs)
        .default_headers(headers.clone())
        .build()
        .map_err(|e| ApiError::Http { reason: e.to_string() })?;

    Ok(Session { client, headers, timeout_secs: prefs.timeout })
}

/// Client settings shared by the session and the token exchange.
pub(crate) fn client_builder(prefs: &Preferences) -> reqwest::ClientBuilder {
    // Fails only when a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();
    reqwest::Client::builder()
        .timeout(Duration::from_secs(prefs.timeout))
        .danger_accept_invalid_certs(!prefs.verify_ssl)
}

/// Classify a transport failure. Nothing here is retried.
pub(crate) fn transport_error(err: &reqwest::Error, url: &Url, timeout_secs: u64) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout { timeout_secs }
    } else if err.is_connect() {
        ApiError::Connectivity { url: url.to_string(), reason: root_cause(err) }
    } else {
        ApiError::Http { reason: root_cause(err) }
    }
}

fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut cause = err;
    while let Some(next) = cause.source() {
        cause = next;
    }
    cause.to_string()
}

fn bad_header(name: &str, err: impl std::fmt::Display) -> ApiError {
    ApiError::preferences(
        format!("Your {name:?} header isn't quite right"),
        format!("{err}\n\nHeaders need plain ascii names and values."),
    )
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
