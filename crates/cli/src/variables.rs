// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `#{name}` substitution from the preferences' `variables` table.

use indexmap::IndexMap;
use serde_json::Value;

use crate::params::QueryParams;

/// Replace every `#{name}` in `text`.
pub fn interpolate(text: &str, variables: &IndexMap<String, String>) -> String {
    if !text.contains("#{") {
        return text.to_owned();
    }
    let mut out = text.to_owned();
    for (name, value) in variables {
        out = out.replace(&format!("#{{{name}}}"), value);
    }
    out
}

/// Interpolate every query value, list elements included.
pub fn interpolate_params(params: &QueryParams, variables: &IndexMap<String, String>) -> QueryParams {
    params.iter().map(|(k, v)| (k.clone(), v.map(|s| interpolate(s, variables)))).collect()
}

/// Interpolate every string inside a JSON body, object keys included.
pub fn interpolate_body(body: &Value, variables: &IndexMap<String, String>) -> Value {
    match body {
        Value::String(s) => Value::String(interpolate(s, variables)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| interpolate_body(v, variables)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (interpolate(k, variables), interpolate_body(v, variables)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
#[path = "variables_tests.rs"]
mod tests;
