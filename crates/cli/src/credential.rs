// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth2 credential: the client configuration plus the current access token.
//!
//! [`read_credential`] projects it out of the preferences. [`write_credential`]
//! produces new preferences holding a fresh token and persists them; it never
//! mutates the caller's copy.

pub mod flow;

use std::time::Duration;

use tracing::{info, warn};

use crate::error::ApiError;
use crate::params::QueryParams;
use crate::prefs::{Preferences, PrefsStore};

/// Snapshot of everything the authorization flow needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub api_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    pub access_token: String,
    pub state: Option<String>,
    pub token_path: String,
    pub authorize_path: String,
    pub authorize_params: QueryParams,
    /// Status the API answers with when the token is no good.
    pub auth_failure_status: u16,
    pub redirect_timeout: Option<Duration>,
}

/// Project the credential out of `prefs`. `None` when OAuth2 isn't the
/// selected auth type.
pub fn read_credential(prefs: &Preferences) -> Result<Option<Credential>, ApiError> {
    let Some(oauth2) = prefs.active_oauth2() else {
        return Ok(None);
    };
    Ok(Some(Credential {
        api_url: prefs.api_url.clone(),
        client_id: oauth2.client_id.clone(),
        client_secret: oauth2.client_secret.clone(),
        scopes: oauth2.scopes.clone(),
        redirect_uri: oauth2.redirect_uri.clone(),
        access_token: oauth2.access_token.clone(),
        state: oauth2.state.clone(),
        token_path: oauth2.token_path.clone(),
        authorize_path: oauth2.authorize_path.clone(),
        authorize_params: oauth2.packed_authorize_params()?,
        auth_failure_status: prefs.auth_test_status,
        redirect_timeout: oauth2.redirect_timeout.map(Duration::from_secs),
    }))
}

/// Result of storing a fresh token.
#[derive(Debug)]
pub struct StoredToken {
    /// Preferences holding the new token, whether or not they reached disk.
    pub prefs: Preferences,
    /// Set when the save failed. The token is still good for this run.
    pub persist_error: Option<ApiError>,
}

/// Swap `new_token` into a copy of `prefs` and persist it through `store`.
pub fn write_credential(prefs: &Preferences, new_token: &str, store: &dyn PrefsStore) -> StoredToken {
    persist_credential(with_access_token(prefs, new_token), store)
}

/// A copy of `prefs` holding `new_token`. Nothing is saved.
pub fn with_access_token(prefs: &Preferences, new_token: &str) -> Preferences {
    let mut updated = prefs.clone();
    match updated.oauth2.as_mut() {
        Some(oauth2) => oauth2.access_token = new_token.to_owned(),
        None => warn!("no oauth2 block to hold the new access token"),
    }
    updated
}

/// Save preferences that already hold the new token.
pub fn persist_credential(updated: Preferences, store: &dyn PrefsStore) -> StoredToken {
    if updated.oauth2.is_none() {
        return StoredToken { prefs: updated, persist_error: None };
    }

    let persist_error = match store.save(&updated) {
        Ok(()) => {
            info!(path = %store.location().display(), "saved new access token");
            None
        }
        Err(e) => {
            warn!(err = e.as_str(), path = %store.location().display(), "failed to save access token");
            Some(e)
        }
    };
    StoredToken { prefs: updated, persist_error }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
