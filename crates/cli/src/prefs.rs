// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Preferences: typed model, validation, and the YAML file store.
//!
//! The file lives at `~/.api-buddy.yml` unless overridden. A missing file is
//! created from [`Preferences::example`]; fields equal to their defaults are
//! left out when saving so the user's file stays small.

use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::highlight::{available_themes, theme_exists, DEFAULT_THEME};
use crate::params::{pack_params, QueryParams};

pub const DEFAULT_AUTH_TEST_STATUS: u16 = 401;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_INDENT: usize = 2;
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/";
pub const DEFAULT_ACCESS_TOKEN: &str = "can_haz_token";
pub const DEFAULT_TOKEN_PATH: &str = "token";
pub const DEFAULT_AUTHORIZE_PATH: &str = "authorize";

const DEFAULT_URL_SCHEME: &str = "https";
const VARIABLE_CHARS: [char; 3] = ['#', '{', '}'];

/// Shown whenever the user needs a reminder of what a preferences file looks like.
pub const EXAMPLE_YAML: &str = "\
api_url: https://api.url.com
auth_type: oauth2
oauth2:
  client_id: your_client_id
  client_secret: your_client_secret
  scopes:
    - one_scope
    - another_scope
  redirect_uri: http://localhost:8080/
  state: something
  token_path: /token
  authorize_path: /authorize
  authorize_params:
    - select_profile=true
auth_test_status: 401
api_version: 2
verify_ssl: false
timeout: 100
headers:
  Origin: your-face
verboseness:
  request: true
  response: true
  print_binaries: false
indent: 4
theme: Solarized (dark)
variables:
  user_id: ab12c3d
  email: me@email.com
";

/// Supported authentication mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum AuthType {
    OAuth2,
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OAuth2 => f.write_str("oauth2"),
        }
    }
}

impl std::str::FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oauth2" => Ok(Self::OAuth2),
            other => Err(format!("unknown auth_type {other:?}, it should be one of: null, oauth2")),
        }
    }
}

impl TryFrom<String> for AuthType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The `oauth2` block of the preferences file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OAuth2Prefs {
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Opaque anti-CSRF value. Generated per flow when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default = "default_access_token")]
    pub access_token: String,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default = "default_authorize_path")]
    pub authorize_path: String,
    /// Provider-specific extras for the authorization URL, as `key=value`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorize_params: Vec<String>,
    /// Give up waiting for the pasted redirect URL after this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_timeout: Option<u64>,
}

impl OAuth2Prefs {
    pub fn packed_authorize_params(&self) -> Result<QueryParams, ApiError> {
        pack_params(&self.authorize_params)
    }
}

/// What to print besides the response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Verboseness {
    #[serde(default)]
    pub request: bool,
    #[serde(default)]
    pub response: bool,
    #[serde(default)]
    pub print_binaries: bool,
}

impl Verboseness {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Unknown keys are refused rather than dropped, so a save never erases
/// anything from the user's file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Preferences {
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<AuthType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2: Option<OAuth2Prefs>,
    #[serde(default = "default_auth_test_status", skip_serializing_if = "is_default_status")]
    pub auth_test_status: u16,
    #[serde(
        default,
        deserialize_with = "de_api_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_version: Option<String>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub verify_ssl: bool,
    #[serde(default = "default_timeout", skip_serializing_if = "is_default_timeout")]
    pub timeout: u64,
    #[serde(default, deserialize_with = "de_flat_map", skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Verboseness::is_default")]
    pub verboseness: Verboseness,
    #[serde(default = "default_indent", skip_serializing_if = "is_default_indent")]
    pub indent: Option<usize>,
    /// Highlighting theme for terminal output. `null` turns highlighting off.
    #[serde(default = "default_theme", skip_serializing_if = "is_default_theme")]
    pub theme: Option<String>,
    #[serde(default, deserialize_with = "de_flat_map", skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, String>,
}

impl Preferences {
    /// Minimal preferences pointing at `api_url`, everything else default.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            auth_type: None,
            oauth2: None,
            auth_test_status: DEFAULT_AUTH_TEST_STATUS,
            api_version: None,
            verify_ssl: true,
            timeout: DEFAULT_TIMEOUT_SECS,
            headers: IndexMap::new(),
            verboseness: Verboseness::default(),
            indent: Some(DEFAULT_INDENT),
            theme: default_theme(),
            variables: IndexMap::new(),
        }
    }

    /// Written out the first time the CLI runs without a preferences file.
    pub fn example() -> Self {
        let mut prefs = Self::new("https://jsonplaceholder.typicode.com");
        prefs.oauth2 = Some(OAuth2Prefs {
            client_id: "your_client_id".to_owned(),
            client_secret: "your_client_secret".to_owned(),
            scopes: vec!["one_scope".to_owned(), "another_scope".to_owned()],
            redirect_uri: default_redirect_uri(),
            state: None,
            access_token: default_access_token(),
            token_path: default_token_path(),
            authorize_path: default_authorize_path(),
            authorize_params: Vec::new(),
            redirect_timeout: None,
        });
        prefs
    }

    /// Normalize and check cross-field rules serde can't express.
    pub fn validate(mut self) -> Result<Self, ApiError> {
        self.api_url = validate_api_url(&self.api_url)?;

        for name in self.variables.keys() {
            if name.contains(VARIABLE_CHARS) {
                return Err(ApiError::preferences(
                    format!("Your variable name {name:?} is too funky"),
                    "You can't use any of these special characters:\n  \"#\" \"{\" \"}\"",
                ));
            }
        }

        if let Some(theme) = self.theme.as_deref() {
            if !theme_exists(theme) {
                return Err(ApiError::preferences(
                    format!("I haven't heard of the {theme} theme before"),
                    format!(
                        "Try one of these, or null for no highlighting:\n  {}",
                        available_themes().join("\n  ")
                    ),
                ));
            }
        }

        match (self.auth_type, &self.oauth2) {
            (Some(AuthType::OAuth2), None) => {
                return Err(ApiError::preferences(
                    "You picked oauth2 but didn't configure it",
                    format!("Add an oauth2 block to your preferences, for example:\n\n{EXAMPLE_YAML}"),
                ));
            }
            (_, Some(oauth2)) => {
                oauth2.packed_authorize_params().map_err(|e| {
                    ApiError::preferences(
                        "Your oauth2 authorize_params aren't quite right",
                        e.message(),
                    )
                })?;
            }
            _ => {}
        }

        Ok(self)
    }

    /// The OAuth2 block, when OAuth2 is the selected auth mechanism.
    pub fn active_oauth2(&self) -> Option<&OAuth2Prefs> {
        match self.auth_type {
            Some(AuthType::OAuth2) => self.oauth2.as_ref(),
            None => None,
        }
    }
}

fn validate_api_url(api_url: &str) -> Result<String, ApiError> {
    let valid_url = if api_url.contains("://") {
        api_url.to_owned()
    } else {
        format!("{DEFAULT_URL_SCHEME}://{api_url}")
    };
    if let Some((base, _)) = valid_url.split_once('?') {
        return Err(ApiError::preferences(
            "Your api_url can't have query parameters",
            format!("Maybe try {base}"),
        ));
    }
    if let Some((base, _)) = valid_url.split_once('#') {
        return Err(ApiError::preferences(
            "Your api_url can't have hash fragments",
            format!("Maybe try {base}"),
        ));
    }
    Ok(valid_url)
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn default_auth_test_status() -> u16 {
    DEFAULT_AUTH_TEST_STATUS
}

fn is_default_status(v: &u16) -> bool {
    *v == DEFAULT_AUTH_TEST_STATUS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn is_default_timeout(v: &u64) -> bool {
    *v == DEFAULT_TIMEOUT_SECS
}

fn default_indent() -> Option<usize> {
    Some(DEFAULT_INDENT)
}

fn is_default_indent(v: &Option<usize>) -> bool {
    *v == Some(DEFAULT_INDENT)
}

fn default_theme() -> Option<String> {
    Some(DEFAULT_THEME.to_owned())
}

fn is_default_theme(v: &Option<String>) -> bool {
    v.as_deref() == Some(DEFAULT_THEME)
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_owned()
}

fn default_access_token() -> String {
    DEFAULT_ACCESS_TOKEN.to_owned()
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_owned()
}

fn default_authorize_path() -> String {
    DEFAULT_AUTHORIZE_PATH.to_owned()
}

/// `api_version: 2` and `api_version: "2"` mean the same thing.
fn de_api_version<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Version {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Version>::deserialize(deserializer)?.map(|v| match v {
        Version::Text(s) => s,
        Version::Int(i) => i.to_string(),
        Version::Float(f) => f.to_string(),
    }))
}

/// Flat `name: scalar` maps. Numbers are stringified; booleans are refused
/// because their capitalization on the wire is ambiguous.
fn de_flat_map<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let raw = Option::<IndexMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut flat = IndexMap::with_capacity(raw.len());
    for (name, value) in raw {
        let value = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => {
                return Err(D::Error::custom(format!(
                    "{name:?} is a boolean, put quotes around it: {name}: '{b}'"
                )));
            }
            Value::Null => {
                return Err(D::Error::custom(format!("{name:?} has no value")));
            }
            _ => {
                return Err(D::Error::custom(format!(
                    "{name:?} can't be nested, try something simpler"
                )));
            }
        };
        flat.insert(name, value);
    }
    Ok(flat)
}

/// Where the preferences file lives when `--prefs` isn't given.
///
/// `$HOME/.api-buddy.yml`, falling back to the working directory.
pub fn default_prefs_path() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => PathBuf::from(home).join(".api-buddy.yml"),
        _ => PathBuf::from(".api-buddy.yml"),
    }
}

/// Durable storage for [`Preferences`].
pub trait PrefsStore: Send + Sync {
    fn load(&self) -> Result<Preferences, ApiError>;

    fn save(&self, prefs: &Preferences) -> Result<(), ApiError>;

    /// Human-readable location, for messages.
    fn location(&self) -> &Path;
}

/// YAML preferences file on disk.
#[derive(Debug, Clone)]
pub struct PrefsFile {
    path: PathBuf,
}

impl PrefsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn persistence_error(&self, reason: impl std::fmt::Display) -> ApiError {
        ApiError::Persistence { path: self.path.clone(), reason: reason.to_string() }
    }
}

impl PrefsStore for PrefsFile {
    fn load(&self) -> Result<Preferences, ApiError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no preferences file, writing an example");
                let prefs = Preferences::example();
                self.save(&prefs)?;
                return Ok(prefs);
            }
            Err(e) => {
                return Err(ApiError::preferences(
                    format!("There was a problem reading {}", self.path.display()),
                    e.to_string(),
                ));
            }
        };

        let value: serde_yaml::Value = serde_yaml::from_str(&contents).map_err(|e| {
            ApiError::preferences(
                format!("There was a problem reading {}", self.path.display()),
                format!("Please make sure it's valid yaml: {e}"),
            )
        })?;
        if value.is_null() {
            return Err(ApiError::preferences(
                "It looks like your preferences are empty",
                format!(
                    "You should put them in {}\nFor example:\n\n{EXAMPLE_YAML}",
                    self.path.display()
                ),
            ));
        }

        let prefs: Preferences = serde_yaml::from_value(value).map_err(|e| {
            ApiError::preferences(
                "Your preferences aren't quite right",
                format!(
                    "{e}\n\nOpen up {} and fix it up, here's an example with all the prefs:\n\n\
                     {EXAMPLE_YAML}",
                    self.path.display()
                ),
            )
        })?;
        debug!(path = %self.path.display(), "loaded preferences");
        prefs.validate()
    }

    /// Write to a temp file beside the target, then rename over it, so a
    /// crash mid-write never leaves a torn preferences file behind.
    fn save(&self, prefs: &Preferences) -> Result<(), ApiError> {
        let yaml = serde_yaml::to_string(prefs).map_err(|e| self.persistence_error(e))?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.persistence_error(e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.persistence_error(e))?;
        tmp.write_all(yaml.as_bytes()).map_err(|e| self.persistence_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.persistence_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.persistence_error(e.error))?;

        debug!(path = %self.path.display(), "saved preferences");
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "prefs_tests.rs"]
mod tests;
