// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive OAuth2 authorization-code flow.
//!
//! One pass through `Idle -> AwaitingUserAction -> ExchangingCode`, ending
//! in `Succeeded` or `Failed`. The only place the process waits on a human
//! is [`AuthPrompt::read_redirect_url`].

use std::future::Future;
use std::io;
use std::pin::Pin;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use reqwest::header::ACCEPT;
use reqwest::Url;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use super::{persist_credential, read_credential, with_access_token, Credential};
use crate::error::ApiError;
use crate::prefs::{Preferences, PrefsStore};
use crate::request::join_url;
use crate::session::{client_builder, create_session, transport_error, Session};

/// The human side of the flow.
pub trait AuthPrompt: Send + Sync {
    /// Try to show `url` in a browser. Failure is not fatal.
    fn open_browser(&self, url: &str) -> io::Result<()>;

    /// Wait for the user to paste back the URL they were redirected to.
    fn read_redirect_url<'a>(
        &'a self,
        auth_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = io::Result<String>> + Send + 'a>>;
}

/// Prompts on the controlling terminal: browser via the platform opener,
/// redirect URL from stdin.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl AuthPrompt for TerminalPrompt {
    fn open_browser(&self, url: &str) -> io::Result<()> {
        let cmd = if cfg!(target_os = "macos") {
            "open"
        } else if cfg!(target_os = "windows") {
            "start"
        } else {
            "xdg-open"
        };
        std::process::Command::new(cmd)
            .arg(url)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map(|_| ())
    }

    fn read_redirect_url<'a>(
        &'a self,
        auth_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = io::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            eprintln!("Sign in here if your browser didn't open:\n\n  {auth_url}\n");
            eprintln!("Then paste the full url you were redirected to:");
            let mut line = String::new();
            let n = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
            }
            Ok(line)
        })
    }
}

/// Where the flow is.
#[derive(Debug)]
pub enum FlowState {
    Idle,
    AwaitingUserAction { auth_url: Url, state: String },
    ExchangingCode { code: String },
    Succeeded { access_token: String },
    Failed(ApiError),
}

impl FlowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingUserAction { .. } => "awaiting_user_action",
            Self::ExchangingCode { .. } => "exchanging_code",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

/// What [`authenticate`] hands back.
#[derive(Debug)]
pub enum AuthOutcome {
    Authenticated {
        session: Session,
        prefs: Preferences,
        /// The new token couldn't be saved. It's still in `prefs` and `session`.
        persist_error: Option<ApiError>,
    },
    Failed(ApiError),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Drives one authorization-code exchange for a credential.
pub struct AuthFlow<'a> {
    credential: Credential,
    http: reqwest::Client,
    timeout_secs: u64,
    prompt: &'a dyn AuthPrompt,
}

impl<'a> AuthFlow<'a> {
    pub fn new(
        credential: Credential,
        prefs: &Preferences,
        prompt: &'a dyn AuthPrompt,
    ) -> Result<Self, ApiError> {
        let http =
            client_builder(prefs).build().map_err(|e| ApiError::Http { reason: e.to_string() })?;
        Ok(Self { credential, http, timeout_secs: prefs.timeout, prompt })
    }

    /// Run to completion, yielding the new access token.
    pub async fn run(&self) -> Result<String, ApiError> {
        let mut state = FlowState::Idle;
        loop {
            state = match state {
                FlowState::Idle => match self.authorization_url() {
                    Ok((auth_url, state)) => FlowState::AwaitingUserAction { auth_url, state },
                    Err(e) => FlowState::Failed(e),
                },
                FlowState::AwaitingUserAction { auth_url, state } => {
                    match self.await_redirect(&auth_url, &state).await {
                        Ok(code) => FlowState::ExchangingCode { code },
                        Err(e) => FlowState::Failed(e),
                    }
                }
                FlowState::ExchangingCode { code } => match self.exchange(&code).await {
                    Ok(access_token) => FlowState::Succeeded { access_token },
                    Err(e) => FlowState::Failed(e),
                },
                FlowState::Succeeded { access_token } => return Ok(access_token),
                FlowState::Failed(e) => {
                    warn!(err = e.as_str(), "oauth2 flow failed");
                    return Err(e);
                }
            };
            debug!(state = state.as_str(), "oauth2 flow");
        }
    }

    /// The URL the user signs in at, and the state it carries.
    pub fn authorization_url(&self) -> Result<(Url, String), ApiError> {
        let cred = &self.credential;
        let state = cred.state.clone().unwrap_or_else(generate_state);
        let mut url = join_url(&cred.api_url, &cred.authorize_path)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &cred.client_id)
                .append_pair("redirect_uri", &cred.redirect_uri)
                .append_pair("scope", &cred.scopes.join(" "))
                .append_pair("state", &state);
            for (key, value) in &cred.authorize_params {
                for v in value.values() {
                    query.append_pair(key, v);
                }
            }
        }
        Ok((url, state))
    }

    async fn await_redirect(&self, auth_url: &Url, state: &str) -> Result<String, ApiError> {
        if let Err(e) = self.prompt.open_browser(auth_url.as_str()) {
            warn!(err = %e, "couldn't open a browser, falling back to the printed url");
        }

        let read = self.prompt.read_redirect_url(auth_url.as_str());
        let pasted = match self.credential.redirect_timeout {
            Some(limit) => tokio::time::timeout(limit, read).await.map_err(|_| ApiError::Prompt {
                reason: format!("I gave up waiting after {} seconds.", limit.as_secs()),
            })?,
            None => read.await,
        }
        .map_err(|e| ApiError::Prompt { reason: e.to_string() })?;

        parse_redirect(pasted.trim(), state)
    }

    async fn exchange(&self, code: &str) -> Result<String, ApiError> {
        let cred = &self.credential;
        let token_url = join_url(&cred.api_url, &cred.token_path)?;
        info!(url = %token_url, "exchanging authorization code");

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", cred.redirect_uri.as_str()),
            ("client_id", cred.client_id.as_str()),
            ("client_secret", cred.client_secret.as_str()),
        ];
        let resp = self
            .http
            .post(token_url.clone())
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| transport_error(&e, &token_url, self.timeout_secs))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| ApiError::Http { reason: e.to_string() })?;
        if !status.is_success() {
            return Err(ApiError::TokenExchange { status: Some(status.as_u16()), body });
        }

        match serde_json::from_str::<TokenResponse>(&body) {
            Ok(TokenResponse { access_token: Some(token) }) if !token.is_empty() => Ok(token),
            _ => Err(ApiError::TokenExchange { status: Some(status.as_u16()), body }),
        }
    }
}

/// Pull the authorization code out of a pasted redirect URL.
pub fn parse_redirect(pasted: &str, expected_state: &str) -> Result<String, ApiError> {
    let url = Url::parse(pasted).map_err(|e| ApiError::Prompt {
        reason: format!("{pasted:?} doesn't look like a url: {e}"),
    })?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(ApiError::StateMismatch { expected: expected_state.to_owned(), received: state });
    }
    if let Some(error) = error {
        return Err(ApiError::TokenExchange {
            status: None,
            body: format!("The provider sent you back with an error: {error}"),
        });
    }
    code.filter(|c| !c.is_empty()).ok_or_else(|| ApiError::TokenExchange {
        status: None,
        body: "The redirect url didn't have a code in it.".to_owned(),
    })
}

/// 32 random bytes, base64url without padding.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Re-authenticate: run the flow, persist the token, build a fresh session.
///
/// A failed flow leaves `prefs` and the stored token untouched.
pub async fn authenticate(
    prefs: &Preferences,
    store: &dyn PrefsStore,
    prompt: &dyn AuthPrompt,
) -> AuthOutcome {
    let credential = match read_credential(prefs) {
        Ok(Some(c)) => c,
        Ok(None) => {
            return AuthOutcome::Failed(ApiError::preferences(
                "OAuth2 isn't set up",
                "Set auth_type to oauth2 and add an oauth2 block to your preferences.",
            ));
        }
        Err(e) => return AuthOutcome::Failed(e),
    };

    let token = match AuthFlow::new(credential, prefs, prompt) {
        Ok(flow) => flow.run().await,
        Err(e) => Err(e),
    };
    let token = match token {
        Ok(t) => t,
        Err(e) => return AuthOutcome::Failed(e),
    };

    // A token the session can't carry never reaches the store.
    let updated = with_access_token(prefs, &token);
    let session = match create_session(&updated) {
        Ok(s) => s,
        Err(e) => return AuthOutcome::Failed(e),
    };
    let stored = persist_credential(updated, store);
    AuthOutcome::Authenticated { session, prefs: stored.prefs, persist_error: stored.persist_error }
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
