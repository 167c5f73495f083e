// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::params::ParamValue;
use crate::prefs::PrefsFile;
use crate::test_support::{oauth2_prefs, MemoryStore};

#[test]
fn read_projects_oauth2_block() -> anyhow::Result<()> {
    let mut prefs = oauth2_prefs("https://fake.api.com/");
    prefs.auth_test_status = 403;
    if let Some(oauth2) = prefs.oauth2.as_mut() {
        oauth2.authorize_params = vec!["prompt=consent".into()];
        oauth2.redirect_timeout = Some(30);
    }

    let cred = read_credential(&prefs)?.ok_or_else(|| anyhow::anyhow!("expected credential"))?;
    assert_eq!(cred.api_url, "https://fake.api.com/");
    assert_eq!(cred.client_id, "client_id");
    assert_eq!(cred.scopes, ["read", "write"]);
    assert_eq!(cred.access_token, "stale-token");
    assert_eq!(cred.auth_failure_status, 403);
    assert_eq!(cred.redirect_timeout, Some(Duration::from_secs(30)));
    assert_eq!(cred.authorize_params["prompt"], ParamValue::One("consent".into()));
    Ok(())
}

#[test]
fn read_is_none_without_active_oauth2() -> anyhow::Result<()> {
    assert!(read_credential(&Preferences::new("https://fake.api.com/"))?.is_none());

    let mut prefs = oauth2_prefs("https://fake.api.com/");
    prefs.auth_type = None;
    assert!(read_credential(&prefs)?.is_none());
    Ok(())
}

#[test]
fn write_saves_exactly_once_and_read_sees_new_token() -> anyhow::Result<()> {
    let prefs = oauth2_prefs("https://fake.api.com/");
    let store = MemoryStore::new(prefs.clone());

    let stored = write_credential(&prefs, "fresh-token", &store);
    assert!(stored.persist_error.is_none());
    assert_eq!(store.saves().len(), 1);

    let reread = read_credential(&store.load()?)?.map(|c| c.access_token);
    assert_eq!(reread.as_deref(), Some("fresh-token"));
    let in_memory = read_credential(&stored.prefs)?.map(|c| c.access_token);
    assert_eq!(in_memory.as_deref(), Some("fresh-token"));
    Ok(())
}

#[test]
fn write_failure_is_reported_but_token_kept() -> anyhow::Result<()> {
    let prefs = oauth2_prefs("https://fake.api.com/");
    let store = MemoryStore::new(prefs.clone()).failing();

    let stored = write_credential(&prefs, "fresh-token", &store);
    assert!(matches!(stored.persist_error, Some(ApiError::Persistence { .. })));
    let token = stored.prefs.active_oauth2().map(|o| o.access_token.as_str());
    assert_eq!(token, Some("fresh-token"));
    Ok(())
}

#[test]
fn write_to_file_round_trips() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = PrefsFile::new(dir.path().join("prefs.yml"));
    let prefs = oauth2_prefs("https://fake.api.com/");
    store.save(&prefs)?;

    let stored = write_credential(&prefs, "fresh-token", &store);
    assert!(stored.persist_error.is_none());
    let on_disk = std::fs::read_to_string(dir.path().join("prefs.yml"))?;
    assert!(on_disk.contains("fresh-token"));
    assert!(!on_disk.contains("stale-token"));
    Ok(())
}

#[test]
fn write_keeps_every_other_pref_in_the_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = PrefsFile::new(dir.path().join("prefs.yml"));
    let mut prefs = oauth2_prefs("https://fake.api.com/");
    prefs.theme = Some("Solarized (dark)".into());
    prefs.timeout = 5;
    prefs.variables.insert("user_id".into(), "ab12c3d".into());
    store.save(&prefs)?;

    write_credential(&store.load()?, "fresh-token", &store);
    let reloaded = store.load()?;
    assert_eq!(reloaded.theme.as_deref(), Some("Solarized (dark)"));
    assert_eq!(reloaded.timeout, 5);
    assert_eq!(reloaded.variables["user_id"], "ab12c3d");
    Ok(())
}
