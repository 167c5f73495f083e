// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request dispatch with one re-authentication on the auth-failure status.

use tracing::{debug, info, warn};

use crate::credential::flow::{authenticate, AuthOutcome, AuthPrompt};
use crate::error::ApiError;
use crate::prefs::{Preferences, PrefsStore};
use crate::request::RequestDescriptor;
use crate::session::{create_session, Session};

/// Re-authentications allowed per dispatch.
pub const MAX_REAUTH_ATTEMPTS: u32 = 1;

/// Owns the live session and the preferences it was built from.
pub struct Dispatcher<'a> {
    session: Session,
    prefs: Preferences,
    store: &'a dyn PrefsStore,
    prompt: &'a dyn AuthPrompt,
    persist_error: Option<ApiError>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        prefs: Preferences,
        store: &'a dyn PrefsStore,
        prompt: &'a dyn AuthPrompt,
    ) -> Result<Self, ApiError> {
        let session = create_session(&prefs)?;
        Ok(Self { session, prefs, store, prompt, persist_error: None })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    /// A save failure from the last re-authentication, if any.
    pub fn take_persist_error(&mut self) -> Option<ApiError> {
        self.persist_error.take()
    }

    /// Send `request`, re-authenticating at most [`MAX_REAUTH_ATTEMPTS`] times
    /// when the API answers with the configured auth-failure status.
    ///
    /// Network errors are returned immediately. Any other status, error
    /// statuses included, is handed back untouched.
    pub async fn dispatch(&mut self, request: &RequestDescriptor) -> Result<reqwest::Response, ApiError> {
        let mut reauths_left = MAX_REAUTH_ATTEMPTS;
        loop {
            let response = self.session.send(request).await?;
            let status = response.status().as_u16();
            debug!(status, url = %request.url(), "response");

            if status != self.prefs.auth_test_status
                || reauths_left == 0
                || self.prefs.active_oauth2().is_none()
            {
                return Ok(response);
            }
            reauths_left -= 1;

            info!(status, "access token rejected, re-authenticating");
            match authenticate(&self.prefs, self.store, self.prompt).await {
                AuthOutcome::Authenticated { session, prefs, persist_error } => {
                    if let Some(ref e) = persist_error {
                        warn!(err = e.as_str(), "continuing with unsaved access token");
                    }
                    self.persist_error = persist_error;
                    self.session = session;
                    self.prefs = prefs;
                }
                AuthOutcome::Failed(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
