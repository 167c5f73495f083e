// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rendering requests and responses for the terminal.

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Node};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::error::ApiError;
use crate::highlight::{highlight, Lang};
use crate::params::query_pairs;
use crate::prefs::Preferences;
use crate::request::RequestDescriptor;

const BINARY_PREFIXES: [&str; 3] = ["audio/", "image/", "video/"];
/// Page chrome and code left out when an HTML response is reduced to text.
const SKIPPED_TAGS: [&str; 8] = ["a", "button", "footer", "head", "header", "nav", "script", "style"];

/// A fully-read response.
#[derive(Debug, Clone)]
pub struct ResponseView {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ResponseView {
    pub async fn collect(response: reqwest::Response) -> Result<Self, ApiError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Http { reason: e.to_string() })?
            .to_vec();
        Ok(Self { status, headers, body })
    }

    fn content_type(&self) -> &str {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("")
    }
}

/// `=> 200` line, headers when verbose, then the body.
///
/// `color` allows highlighting with the preferred theme.
pub fn render_response(view: &ResponseView, prefs: &Preferences, color: bool) -> String {
    let theme = theme(prefs, color);
    let verbose = prefs.verboseness.response;
    let mut out = match (verbose, view.status.canonical_reason()) {
        (true, Some(reason)) => format!("=> {} {reason}\n", view.status.as_u16()),
        _ => format!("=> {}\n", view.status.as_u16()),
    };
    if verbose {
        out.push_str(&colorize(render_headers(&view.headers), Lang::Yaml, theme));
    }

    let body = render_body(view, prefs, theme);
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&body);
        out.push('\n');
    }
    out
}

fn render_body(view: &ResponseView, prefs: &Preferences, theme: Option<&str>) -> String {
    if view.body.is_empty() {
        return String::new();
    }
    let content_type = view.content_type();
    if is_binary(content_type) && !prefs.verboseness.print_binaries {
        return format!("Binary response: {content_type}");
    }
    if content_type.to_ascii_lowercase().contains("html") {
        return strip_html(&String::from_utf8_lossy(&view.body));
    }
    match serde_json::from_slice::<Value>(&view.body) {
        Ok(json) => colorize(format_json(&json, prefs.indent), Lang::Json, theme),
        Err(_) => String::from_utf8_lossy(&view.body).trim_end().to_owned(),
    }
}

fn theme(prefs: &Preferences, color: bool) -> Option<&str> {
    prefs.theme.as_deref().filter(|_| color)
}

fn colorize(text: String, lang: Lang, theme: Option<&str>) -> String {
    match theme {
        Some(theme) if !text.is_empty() => highlight(&text, lang, theme),
        _ => text,
    }
}

/// Readable text of an HTML page: one trimmed line per text line, blanks dropped.
pub fn strip_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();
    collect_text(document.root_element(), &mut text);
    text.lines().map(str::trim).filter(|line| !line.is_empty()).collect::<Vec<_>>().join("\n")
}

fn collect_text(element: ElementRef<'_>, text: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if SKIPPED_TAGS.contains(&e.name()) => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, text);
                }
            }
            _ => {}
        }
    }
}

fn is_binary(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    BINARY_PREFIXES.iter().any(|p| ct.starts_with(p)) || ct.contains("pdf")
}

/// Request line, session headers and body, as about to be sent.
pub fn render_request(
    request: &RequestDescriptor,
    headers: &HeaderMap,
    prefs: &Preferences,
    color: bool,
) -> String {
    let theme = theme(prefs, color);
    let mut url = request.url().clone();
    let pairs = query_pairs(request.params());
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }

    let mut out = format!("{} {url}\n", request.method().as_str().to_uppercase());
    out.push_str(&colorize(render_headers(headers), Lang::Yaml, theme));
    if let Some(body) = request.body() {
        out.push('\n');
        out.push_str(&colorize(format_json(body, prefs.indent), Lang::Json, theme));
        out.push('\n');
    }
    out
}

fn render_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{name}: {}\n", String::from_utf8_lossy(value.as_bytes())))
        .collect()
}

/// Pretty-print with `indent` spaces, or compact when `None`.
pub fn format_json(value: &Value, indent: Option<usize>) -> String {
    let Some(width) = indent else {
        return value.to_string();
    };
    let pad = " ".repeat(width);
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(pad.as_bytes()));
    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
