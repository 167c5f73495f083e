// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request descriptors: what to send, frozen before the first attempt.

use reqwest::Url;
use serde_json::Value;

use crate::error::ApiError;
use crate::params::{pack_params, parse_body, QueryParams};
use crate::prefs::Preferences;
use crate::variables::{interpolate, interpolate_body, interpolate_params};

/// HTTP methods the CLI knows how to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            "delete" => Ok(Self::Delete),
            _ => Err(ApiError::UnsupportedMethod { method: s.to_owned() }),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// An immutable request. Fields are only readable so a retry resends
/// exactly what the first attempt sent.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    params: QueryParams,
    body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url, params: QueryParams, body: Option<Value>) -> Self {
        Self { method, url, params, body }
    }

    /// Build from raw CLI words: `<method> <endpoint> [key=value ...] [json]`.
    ///
    /// Validation happens before anything touches the network. Variables are
    /// interpolated here, once.
    pub fn from_args(args: &[String], prefs: &Preferences) -> Result<Self, ApiError> {
        let (method, rest) = match args.split_first() {
            Some((m, rest)) => (m.parse::<Method>()?, rest),
            None => return Err(ApiError::UnsupportedMethod { method: String::new() }),
        };
        let (endpoint, rest) = rest
            .split_first()
            .ok_or_else(|| ApiError::MissingEndpoint { method: method.to_string() })?;
        let endpoint = validate_endpoint(endpoint)?;

        let (raw_params, raw_body) = match rest.split_last() {
            Some((last, init)) if looks_like_json(last) => (init, Some(last.as_str())),
            _ => (rest, None),
        };
        let params = pack_params(raw_params)?;
        let body = raw_body.map(parse_body).transpose()?;

        let vars = &prefs.variables;
        let endpoint = interpolate(endpoint, vars);
        let params = interpolate_params(&params, vars);
        let body = body.map(|b| interpolate_body(&b, vars));

        let url = api_url_join(&prefs.api_url, prefs.api_version.as_deref(), &endpoint)?;
        Ok(Self::new(method, url, params, body))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

fn looks_like_json(arg: &str) -> bool {
    matches!(arg.trim_start().chars().next(), Some('{') | Some('['))
}

/// Endpoints are paths relative to `api_url`, never full URLs.
pub fn validate_endpoint(endpoint: &str) -> Result<&str, ApiError> {
    match Url::parse(endpoint) {
        Ok(url) if !url.cannot_be_a_base() => Err(ApiError::InvalidEndpoint {
            endpoint: endpoint.to_owned(),
            path: url.path().to_owned(),
        }),
        _ => Ok(endpoint),
    }
}

/// Join the base URL, optional version and endpoint.
///
/// - `a`, none, `c` => `a/c`
/// - `a`, `b`, `c` => `a/b/c`
///
/// Resolution follows RFC 3986, so a base without a trailing slash has its
/// last segment replaced.
pub fn api_url_join(api_url: &str, api_version: Option<&str>, endpoint: &str) -> Result<Url, ApiError> {
    let mut path = endpoint.trim_start_matches('/').to_owned();
    if let Some(version) = api_version {
        path = format!("{version}/{path}");
    }
    join_url(api_url, &path)
}

/// Resolve `path` against `base`, reporting a bad base as a preferences problem.
pub fn join_url(base: &str, path: &str) -> Result<Url, ApiError> {
    let base = Url::parse(base).map_err(|e| {
        ApiError::preferences(format!("Your api_url {base:?} isn't a valid url"), e.to_string())
    })?;
    base.join(path).map_err(|e| {
        ApiError::preferences(format!("I can't build a url from {path:?}"), e.to_string())
    })
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
