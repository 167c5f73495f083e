// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing error taxonomy.
//!
//! Every failure the CLI can surface is an [`ApiError`]. The `Display` impl is
//! the short title; [`ApiError::message`] is the longer explanation printed
//! under it. Nothing here ever reaches the user as a raw backtrace.

use std::path::PathBuf;

/// Exit status for any reported [`ApiError`].
pub const EXIT_FAILURE: i32 = 1;

/// Exit status when the user interrupts a request (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("One of your query params is borked")]
    MalformedParameter { param: String },

    #[error("Your request body isn't valid JSON")]
    InvalidBodyJson { raw: String, reason: String },

    #[error("I don't know how to send a {method:?} request")]
    UnsupportedMethod { method: String },

    #[error("I can't reach {url}")]
    Connectivity { url: String, reason: String },

    #[error("The request took longer than {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("The OAuth2 state you pasted back doesn't match")]
    StateMismatch { expected: String, received: Option<String> },

    #[error("I couldn't exchange your authorization code for a token")]
    TokenExchange { status: Option<u16>, body: String },

    #[error("I couldn't save your preferences to {}", path.display())]
    Persistence { path: PathBuf, reason: String },

    #[error("{title}")]
    Preferences { title: String, message: String },

    #[error("Check your endpoint")]
    InvalidEndpoint { endpoint: String, path: String },

    #[error("Which endpoint do you want to {method}?")]
    MissingEndpoint { method: String },

    #[error("I couldn't read the redirect url")]
    Prompt { reason: String },

    #[error("The HTTP client gave up")]
    Http { reason: String },

    #[error("I couldn't print the response")]
    Output { reason: String },
}

impl ApiError {
    /// Stable machine-readable identifier, used as a structured log field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedParameter { .. } => "MALFORMED_PARAMETER",
            Self::InvalidBodyJson { .. } => "INVALID_BODY_JSON",
            Self::UnsupportedMethod { .. } => "UNSUPPORTED_METHOD",
            Self::Connectivity { .. } => "CONNECTIVITY",
            Self::Timeout { .. } => "TIMEOUT",
            Self::StateMismatch { .. } => "STATE_MISMATCH",
            Self::TokenExchange { .. } => "TOKEN_EXCHANGE",
            Self::Persistence { .. } => "PERSISTENCE",
            Self::Preferences { .. } => "PREFERENCES",
            Self::InvalidEndpoint { .. } => "INVALID_ENDPOINT",
            Self::MissingEndpoint { .. } => "MISSING_ENDPOINT",
            Self::Prompt { .. } => "PROMPT",
            Self::Http { .. } => "HTTP",
            Self::Output { .. } => "OUTPUT",
        }
    }

    pub fn title(&self) -> String {
        self.to_string()
    }

    /// Longer explanation shown beneath the title.
    pub fn message(&self) -> String {
        match self {
            Self::MalformedParameter { param } => {
                format!("{param} should contain one and only one \"=\"")
            }
            Self::InvalidBodyJson { raw, reason } => {
                format!("{reason}\n\nHere's what I got:\n{raw}")
            }
            Self::UnsupportedMethod { .. } => {
                "Try one of these instead: get, post, patch, put, delete".to_owned()
            }
            Self::Connectivity { reason, .. } => format!(
                "{reason}\n\nCheck the api_url setting in your preferences and make sure \
                 you're connected to the internet."
            ),
            Self::Timeout { timeout_secs } => format!(
                "I waited {timeout_secs} seconds for a response.\n\nIf you want to wait \
                 longer, update the timeout setting in your preferences."
            ),
            Self::StateMismatch { expected, received } => {
                let received = received.as_deref().unwrap_or("nothing");
                format!(
                    "I sent state {expected:?} but the redirect url came back with \
                     {received}.\n\nStart over and paste the url from the same sign-in."
                )
            }
            Self::TokenExchange { status: Some(status), body } => {
                format!("The token endpoint answered {status}:\n{body}")
            }
            Self::TokenExchange { status: None, body } => body.clone(),
            Self::Persistence { reason, .. } => format!(
                "{reason}\n\nYour new access token still works for this request, but you'll \
                 have to sign in again next time."
            ),
            Self::Preferences { message, .. } => message.clone(),
            Self::InvalidEndpoint { path, .. } => format!(
                "You don't need to supply the full url, just the path.\nDid you mean {path:?}?"
            ),
            Self::MissingEndpoint { method } => {
                format!("Give me the path after the method, like:\n  api {method} some-endpoint")
            }
            Self::Prompt { reason } => reason.clone(),
            Self::Http { reason } | Self::Output { reason } => reason.clone(),
        }
    }

    /// Render as the headline + explanation block printed on stderr.
    pub fn report(&self) -> String {
        format!("Whoops! {}\n\n{}\n", self.title(), self.message())
    }

    pub fn exit_code(&self) -> i32 {
        EXIT_FAILURE
    }

    pub(crate) fn preferences(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Preferences { title: title.into(), message: message.into() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
