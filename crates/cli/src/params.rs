// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Query parameter and request body codec.
//!
//! `key=value` arguments are packed into an insertion-ordered map where a
//! repeated key collects its values into a list:
//!
//! ```text
//! ["key1=val1", "key2=val2", "key2=val3"]
//! => {"key1": "val1", "key2": ["val2", "val3"]}
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Packed query parameters, in first-seen key order.
pub type QueryParams = IndexMap<String, ParamValue>;

/// A single query value or every value of a repeated key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    One(String),
    Many(Vec<String>),
}

impl ParamValue {
    pub fn values(&self) -> &[String] {
        match self {
            Self::One(v) => std::slice::from_ref(v),
            Self::Many(vs) => vs,
        }
    }

    /// Apply `f` to every value, keeping the shape.
    pub fn map(&self, f: impl Fn(&str) -> String) -> Self {
        match self {
            Self::One(v) => Self::One(f(v)),
            Self::Many(vs) => Self::Many(vs.iter().map(|v| f(v)).collect()),
        }
    }
}

/// Pack `key=value` strings. Each must contain exactly one `=`.
pub fn pack_params<I, S>(raw: I) -> Result<QueryParams, ApiError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut params = QueryParams::new();
    for pair in raw {
        let pair = pair.as_ref();
        let (key, val) = match pair.split_once('=') {
            Some((k, v)) if !v.contains('=') => (k, v),
            _ => return Err(ApiError::MalformedParameter { param: pair.to_owned() }),
        };
        match params.get_mut(key) {
            None => {
                params.insert(key.to_owned(), ParamValue::One(val.to_owned()));
            }
            Some(slot) => {
                let merged = match std::mem::replace(slot, ParamValue::Many(Vec::new())) {
                    ParamValue::One(prev) => vec![prev, val.to_owned()],
                    ParamValue::Many(mut list) => {
                        list.push(val.to_owned());
                        list
                    }
                };
                *slot = ParamValue::Many(merged);
            }
        }
    }
    Ok(params)
}

/// Inverse of [`pack_params`]: one `key=value` per value, list values in order.
pub fn unpack_params(params: &QueryParams) -> Vec<String> {
    query_pairs(params).into_iter().map(|(k, v)| format!("{k}={v}")).collect()
}

/// Flatten into `(key, value)` pairs suitable for URL encoding.
pub fn query_pairs(params: &QueryParams) -> Vec<(&str, &str)> {
    params
        .iter()
        .flat_map(|(k, v)| v.values().iter().map(move |item| (k.as_str(), item.as_str())))
        .collect()
}

/// Parse a JSON request body.
pub fn parse_body(raw: &str) -> Result<serde_json::Value, ApiError> {
    serde_json::from_str(raw)
        .map_err(|e| ApiError::InvalidBodyJson { raw: raw.to_owned(), reason: e.to_string() })
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
